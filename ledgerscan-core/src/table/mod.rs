use glam::Vec2;

use crate::{analysis::bbox::Bbox, error::LedgerscanError, layout::page::PageImage};

pub mod extractor;
pub mod visualize;

pub use extractor::TableExtractor;

/// One table candidate in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: Bbox,
    pub proba: f32,
}

impl Detection {
    pub fn new(bbox: Bbox, proba: f32) -> Self {
        Self { bbox, proba }
    }

    /// `[x1, y1, x2, y2]`
    pub fn coordinates(&self) -> [f32; 4] {
        [self.bbox.min.x, self.bbox.min.y, self.bbox.max.x, self.bbox.max.y]
    }
}

/// Table detection model seam: a rendered page in, table boxes out, in
/// detection order.
pub trait TableDetector {
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError>;
}

impl<T: TableDetector + ?Sized> TableDetector for Box<T> {
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
        (**self).detect(page)
    }
}

/// Treats the whole page as a single table.
///
/// Used when no detection model is configured, for statements whose pages
/// are nothing but the transaction table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPageDetector;

impl TableDetector for FullPageDetector {
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
        let bbox = Bbox::new(Vec2::ZERO, page.image_size());
        if bbox.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Detection::new(bbox, 1.0)])
    }
}

#[cfg(test)]
mod tests {
    use image::DynamicImage;

    use super::*;

    #[test]
    fn test_full_page_detector() -> Result<(), LedgerscanError> {
        let page = PageImage::new(DynamicImage::new_rgb8(300, 500), 0);
        let detections = FullPageDetector.detect(&page)?;

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].coordinates(), [0.0, 0.0, 300.0, 500.0]);
        Ok(())
    }
}
