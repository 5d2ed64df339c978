//! Embedded browser control page.
//!
//! Single-page UI served at `/`: a camera URL form, the live MJPEG view,
//! and a legend for the annotation colors. Kept inline so the binary has no
//! static-file directory to deploy.

/// The control page HTML.
pub const CONTROL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Privacy Blur</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: Arial, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            padding: 20px;
            min-height: 100vh;
        }
        .container {
            max-width: 1200px;
            margin: 0 auto;
            background: white;
            border-radius: 20px;
            padding: 40px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
        }
        h1 { color: #667eea; text-align: center; margin-bottom: 30px; }
        .input-section {
            background: #f8f9ff;
            padding: 30px;
            border-radius: 15px;
            margin-bottom: 30px;
        }
        .input-group { display: flex; gap: 15px; margin-bottom: 20px; }
        input {
            flex: 1;
            padding: 15px;
            border: 2px solid #e0e7ff;
            border-radius: 10px;
            font-size: 16px;
        }
        button {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            border: none;
            padding: 15px 40px;
            border-radius: 10px;
            cursor: pointer;
            font-size: 16px;
            font-weight: bold;
        }
        .stop-btn { background: linear-gradient(135deg, #ef4444 0%, #dc2626 100%); }
        .video-container { display: none; text-align: center; }
        .video-container.active { display: block; }
        img { max-width: 100%; border-radius: 15px; }
        .info-box {
            background: #e0e7ff;
            padding: 20px;
            border-radius: 10px;
            margin-top: 20px;
        }
        .status {
            background: #10b981;
            color: white;
            padding: 10px 20px;
            border-radius: 8px;
            display: inline-block;
            margin-top: 10px;
        }
        .example {
            background: white;
            padding: 10px;
            border-radius: 5px;
            margin-top: 5px;
            font-family: monospace;
            color: #4c1d95;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Privacy Blur</h1>

        <div class="input-section">
            <h2 style="color: #667eea; margin-bottom: 20px;">Enter Your Camera URL</h2>
            <div class="input-group">
                <input type="text" id="cameraUrl" placeholder="http://192.168.1.100:8080/video">
                <button onclick="startCamera()">Start Stream</button>
            </div>
            <div style="background: #e0e7ff; padding: 15px; border-radius: 8px;">
                <strong>Example URL formats:</strong>
                <div class="example">http://192.168.1.100:8080/video</div>
                <div class="example">rtsp://192.168.1.100:554/stream</div>
            </div>
        </div>

        <div class="video-container" id="videoContainer">
            <button class="stop-btn" onclick="stopCamera()">Stop Stream</button>
            <div style="margin-top: 20px;">
                <img id="videoStream" style="display: none;">
            </div>
            <div class="info-box">
                <h3>Detection Active:</h3>
                <p><strong style="color: #10b981;">Green box:</strong> Main speaker (stays clear)</p>
                <p><strong style="color: #ef4444;">Red box:</strong> Background people (blurred)</p>
                <p><strong style="color: #3b82f6;">Blue box:</strong> ID cards (blurred)</p>
                <div class="status" id="status">Ready to connect</div>
            </div>
        </div>
    </div>

    <script>
        function startCamera() {
            const url = document.getElementById('cameraUrl').value;
            if (!url) {
                alert('Please enter a camera URL!');
                return;
            }

            fetch('/set_camera', {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify({url: url})
            })
            .then(response => response.json())
            .then(data => {
                if (data.status === 'success') {
                    document.getElementById('videoContainer').classList.add('active');
                    document.getElementById('videoStream').style.display = 'block';
                    document.getElementById('videoStream').src = '/video_feed?' + new Date().getTime();
                    document.getElementById('status').textContent = 'Live';
                    document.getElementById('status').style.background = '#10b981';
                } else {
                    alert('Error: ' + data.message);
                }
            })
            .catch(error => {
                alert('Connection failed: ' + error);
            });
        }

        function stopCamera() {
            fetch('/stop_camera', {method: 'POST'})
            .then(() => {
                document.getElementById('videoContainer').classList.remove('active');
                document.getElementById('videoStream').style.display = 'none';
                document.getElementById('status').textContent = 'Stopped';
                document.getElementById('status').style.background = '#6b7280';
            });
        }
    </script>
</body>
</html>
"#;
