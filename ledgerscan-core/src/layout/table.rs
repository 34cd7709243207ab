use image::DynamicImage;
use serde::Serialize;

use crate::{analysis::bbox::Bbox, layout::element::BoundingBox};

/// A table region found on one page.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TableBox {
    pub bbox: BoundingBox,
    pub page_number: usize,
    /// Detector score, `1.0` for regions that were not scored.
    pub proba: f32,
}

impl TableBox {
    /// Wraps raw `[x1, y1, x2, y2]` detector output, truncating to pixels.
    pub fn from_coordinates(coordinates: [f32; 4], page_number: usize) -> Self {
        let [x1, y1, x2, y2] = coordinates;
        Self {
            bbox: BoundingBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
            page_number,
            proba: 1.0,
        }
    }

    pub fn from_detection(bbox: Bbox, proba: f32, page_number: usize) -> Self {
        Self {
            bbox: bbox.into(),
            page_number,
            proba,
        }
    }

    pub fn to_list(&self) -> [i32; 4] {
        [self.bbox.x1, self.bbox.y1, self.bbox.x2, self.bbox.y2]
    }
}

/// A detected table together with the page it must be cut from.
///
/// The page image is borrowed whole; the region is only cropped when it is
/// handed to OCR.
#[derive(Clone, Debug)]
pub struct ProcessedTable<'a> {
    pub image: &'a DynamicImage,
    pub coordinates: TableBox,
    pub page_number: usize,
}

/// Intersection of `bbox` with the image bounds, `None` when it has no area.
pub fn clamp_region(image: &DynamicImage, bbox: &BoundingBox) -> Option<BoundingBox> {
    let width = image.width() as i32;
    let height = image.height() as i32;

    let x1 = bbox.x1.clamp(0, width);
    let y1 = bbox.y1.clamp(0, height);
    let x2 = bbox.x2.clamp(0, width);
    let y2 = bbox.y2.clamp(0, height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(BoundingBox::new(x1, y1, x2, y2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_box_truncates_coordinates() {
        let table = TableBox::from_coordinates([10.9, 20.2, 300.7, 400.0], 2);
        assert_eq!(table.to_list(), [10, 20, 300, 400]);
        assert_eq!(table.page_number, 2);
    }

    #[test]
    fn test_clamp_region() {
        let page = DynamicImage::new_rgb8(200, 100);

        assert_eq!(
            clamp_region(&page, &BoundingBox::new(10, 20, 60, 50)),
            Some(BoundingBox::new(10, 20, 60, 50))
        );

        // clamped to the page
        assert_eq!(
            clamp_region(&page, &BoundingBox::new(150, 50, 400, 400)),
            Some(BoundingBox::new(150, 50, 200, 100))
        );

        // zero area
        assert!(clamp_region(&page, &BoundingBox::new(10, 20, 10, 80)).is_none());
        assert!(clamp_region(&page, &BoundingBox::new(250, 20, 300, 80)).is_none());
    }
}
