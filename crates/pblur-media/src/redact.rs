//! Redaction policy: who gets blurred, who stays visible.
//!
//! Given one frame's face and document detections, the policy blurs every
//! region that should not be visible and leaves the single primary speaker
//! face clear. Redaction is strictly region-local: blur writes only inside
//! a detection's own clamped rect. Documents are processed after faces, so
//! a document overlapping a face ends up with the stronger document blur.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use std::path::Path;
use tracing::{debug, warn};

use pblur_models::{Detection, PixelRect, RedactionConfig};

/// Outline color for the primary speaker (kept visible).
const SPEAKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline color for blurred background faces.
const PERSON_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Outline color for blurred identity documents.
const DOCUMENT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const SPEAKER_LABEL: &str = "Speaker";
const PERSON_LABEL: &str = "Person";
const DOCUMENT_LABEL: &str = "ID Card";

/// Default path for the label font. Labels degrade to outline-only when the
/// file is absent.
pub const DEFAULT_FONT_PATH: &str = "assets/fonts/DejaVuSans.ttf";

const LABEL_SCALE: f32 = 14.0;

/// Per-frame redaction policy.
pub struct RedactionPolicy {
    config: RedactionConfig,
    font: Option<Font<'static>>,
}

impl RedactionPolicy {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config, font: None }
    }

    /// Attach a label font if the file at `path` exists and parses.
    ///
    /// A missing or unreadable font is not an error: outlines are still
    /// drawn, labels are skipped.
    pub fn with_font_if_available(mut self, path: impl AsRef<Path>) -> Self {
        self.font = load_label_font(path.as_ref());
        self
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    /// Select the primary (unblurred) face: largest area, ties broken by
    /// first-seen order in the detector output.
    pub fn select_primary(faces: &[Detection]) -> Option<usize> {
        let mut primary: Option<(usize, i64)> = None;
        for (idx, face) in faces.iter().enumerate() {
            let area = face.area();
            match primary {
                // Strictly greater, so the earliest of tied areas wins.
                Some((_, best)) if area <= best => {}
                _ => primary = Some((idx, area)),
            }
        }
        primary.map(|(idx, _)| idx)
    }

    /// Inclusive area gate for document detections.
    pub fn document_passes_gate(&self, area: i64) -> bool {
        area >= self.config.doc_area_min && area <= self.config.doc_area_max
    }

    /// Apply the full redaction plan for one frame to `output`.
    ///
    /// `faces` and `documents` must come from detection runs against the
    /// pristine frame, never against `output` itself.
    pub fn apply(&self, output: &mut RgbImage, faces: &[Detection], documents: &[Detection]) {
        let (width, height) = output.dimensions();
        let primary = Self::select_primary(faces);

        for (idx, face) in faces.iter().enumerate() {
            if Some(idx) == primary {
                self.draw_annotation(output, &face.rect, SPEAKER_COLOR, SPEAKER_LABEL);
                continue;
            }
            if let Some(region) = face.rect.clamp_to(width, height) {
                blur_region(output, &region, self.config.face_blur.sigma);
            }
            self.draw_annotation(output, &face.rect, PERSON_COLOR, PERSON_LABEL);
        }

        let mut kept_documents = 0usize;
        for document in documents {
            let Some(region) = document.rect.clamp_to(width, height) else {
                continue;
            };
            if !self.document_passes_gate(region.area()) {
                continue;
            }
            kept_documents += 1;
            blur_region(output, &region, self.config.doc_blur.sigma);
            self.draw_annotation(output, &document.rect, DOCUMENT_COLOR, DOCUMENT_LABEL);
        }

        debug!(
            faces = faces.len(),
            documents = kept_documents,
            primary = ?primary,
            "Redaction applied"
        );
    }

    /// Draw the 2 px outline and, when a font is loaded, the label above it.
    fn draw_annotation(&self, output: &mut RgbImage, rect: &PixelRect, color: Rgb<u8>, label: &str) {
        if rect.is_empty() {
            return;
        }
        let (w, h) = (rect.width() as u32, rect.height() as u32);
        draw_hollow_rect_mut(output, Rect::at(rect.x1, rect.y1).of_size(w, h), color);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(
                output,
                Rect::at(rect.x1 + 1, rect.y1 + 1).of_size(w - 2, h - 2),
                color,
            );
        }

        if let Some(font) = &self.font {
            let y = rect.y1 - (LABEL_SCALE as i32 + 2);
            draw_text_mut(
                output,
                color,
                rect.x1,
                y.max(0),
                Scale::uniform(LABEL_SCALE),
                font,
                label,
            );
        }
    }
}

/// Replace the pixels inside `region` with a Gaussian-smoothed copy.
///
/// Crop-blur-replace keeps the write strictly inside the region; pixels
/// outside the rect are untouched. `region` must already be clamped and
/// non-empty.
fn blur_region(output: &mut RgbImage, region: &PixelRect, sigma: f32) {
    let crop = image::imageops::crop_imm(
        output,
        region.x1 as u32,
        region.y1 as u32,
        region.width() as u32,
        region.height() as u32,
    )
    .to_image();
    let blurred = gaussian_blur_f32(&crop, sigma);
    image::imageops::replace(output, &blurred, region.x1 as i64, region.y1 as i64);
}

/// Load a TTF label font, returning `None` when the file is missing or
/// malformed.
pub fn load_label_font(path: &Path) -> Option<Font<'static>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!(path = %path.display(), "Label font not found, drawing outlines only");
            return None;
        }
    };
    match Font::try_from_vec(bytes) {
        Some(font) => Some(font),
        None => {
            warn!(path = %path.display(), "Label font failed to parse, drawing outlines only");
            None
        }
    }
}
