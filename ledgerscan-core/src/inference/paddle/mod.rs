use std::path::Path;

use glam::Vec2;
use image::{DynamicImage, GenericImageView};
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    error::*,
    inference::model::{OnnxSession, session_builder},
    ocr::{
        OcrEngine,
        result::{OcrDocument, OcrLine, OcrWord},
    },
};

pub mod det;
pub mod rec;

use det::{PaddleDet, PaddleDetSession};
use rec::{PaddleRec, PaddleRecSession};

/// PP-OCR detection and recognition chained into an OCR backend.
pub struct PaddleOcr {
    det: PaddleDetSession,
    rec: PaddleRecSession,
}

impl PaddleOcr {
    pub fn new(det: PaddleDet, rec: PaddleRec) -> Result<Self, LedgerscanError> {
        let det = PaddleDetSession::new(session_builder()?, det)?;
        let rec = PaddleRecSession::new(session_builder()?, rec)?;
        Ok(Self { det, rec })
    }

    /// Lines of an in-memory image, geometry normalized to that image.
    pub fn recognize_image(&mut self, image: &DynamicImage) -> Result<Vec<OcrLine>, LedgerscanError> {
        let (width, height) = image.dimensions();
        let image_size = Vec2::new(width as f32, height as f32);

        let mut lines = Vec::new();
        for detection in self.det.detect_text_lines(image)? {
            let bbox = detection.bbox;
            let crop = image.crop_imm(
                bbox.min.x as u32,
                bbox.min.y as u32,
                bbox.width().max(1.0) as u32,
                bbox.height().max(1.0) as u32,
            );
            let recognition = self.rec.run(&crop, ())?;
            trace!("line {:?}: `{}`", bbox, recognition.text);

            let words = split_words(&recognition.text, recognition.confidence, &bbox, image_size);
            if !words.is_empty() {
                lines.push(OcrLine { words });
            }
        }

        Ok(lines)
    }
}

impl OcrEngine for PaddleOcr {
    #[tracing::instrument(skip_all, fields(image = %image_path.display()))]
    fn recognize(&mut self, image_path: &Path) -> Result<OcrDocument, LedgerscanError> {
        let image = image::open(image_path).context(ImageReadSnafu {
            path: image_path.to_string_lossy(),
        })?;

        let lines = self.recognize_image(&image)?;
        debug!("recognized {} lines", lines.len());

        Ok(OcrDocument::from_lines(lines))
    }
}

/// Splits a recognized line on whitespace. Each word gets a horizontal slice
/// of the line box proportional to its character count, spaces included, and
/// the full line height.
pub fn split_words(text: &str, confidence: f32, line: &Bbox, image_size: Vec2) -> Vec<OcrWord> {
    let total = text.chars().count();
    if total == 0 || image_size.x <= 0.0 || image_size.y <= 0.0 {
        return Vec::new();
    }
    let char_width = line.width() / total as f32;

    let mut words = Vec::new();
    let mut offset = 0;
    for (idx, token) in text.split(' ').enumerate() {
        if idx > 0 {
            offset += 1;
        }
        let len = token.chars().count();
        if !token.trim().is_empty() {
            let x0 = line.min.x + offset as f32 * char_width;
            let x1 = line.min.x + (offset + len) as f32 * char_width;
            words.push(OcrWord {
                value: token.trim().to_string(),
                confidence,
                geometry: [
                    [x0 / image_size.x, line.min.y / image_size.y],
                    [x1 / image_size.x, line.max.y / image_size.y],
                ],
            });
        }
        offset += len;
    }

    words
}
