use std::path::Path;

use crate::error::LedgerscanError;

pub mod command;
pub mod debit;
pub mod extractor;
pub mod result;

pub use extractor::{OcrConfig, OcrExtractor};
pub use result::{OcrBlock, OcrDocument, OcrLine, OcrPage, OcrWord};

/// Any OCR backend: reads the image at `image_path` and returns its words
/// with geometry normalized to that image.
pub trait OcrEngine {
    fn recognize(&mut self, image_path: &Path) -> Result<OcrDocument, LedgerscanError>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
    fn recognize(&mut self, image_path: &Path) -> Result<OcrDocument, LedgerscanError> {
        (**self).recognize(image_path)
    }
}
