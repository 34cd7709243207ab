use tracing::*;

use crate::{
    error::LedgerscanError,
    layout::{
        page::PageImage,
        table::{ProcessedTable, TableBox},
    },
    table::TableDetector,
};

/// Table Region Extractor: runs the detector on a page and pairs every box
/// with the page image it belongs to.
pub struct TableExtractor<D: TableDetector> {
    detector: D,
}

impl<D: TableDetector> TableExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// Table boxes of one page, in detection order.
    pub fn detect_tables(&mut self, page: &PageImage) -> Result<Vec<TableBox>, LedgerscanError> {
        let tables = self
            .detector
            .detect(page)?
            .into_iter()
            .map(|detection| TableBox::from_detection(detection.bbox, detection.proba, page.page_no))
            .collect::<Vec<_>>();

        if tables.is_empty() {
            debug!("no table found on page {}", page.page_no);
        } else {
            debug!("page {} has {} tables", page.page_no, tables.len());
        }

        Ok(tables)
    }

    /// One [`ProcessedTable`] per detected box. Nothing is cropped here.
    pub fn extract_tables<'a>(
        &mut self,
        page: &'a PageImage,
    ) -> Result<Vec<ProcessedTable<'a>>, LedgerscanError> {
        let tables = self
            .detect_tables(page)?
            .into_iter()
            .map(|coordinates| ProcessedTable {
                image: &page.image,
                coordinates,
                page_number: page.page_no,
            })
            .collect();

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use image::DynamicImage;

    use super::*;
    use crate::{analysis::bbox::Bbox, table::Detection};

    struct FixedDetector(Vec<Detection>);

    impl TableDetector for FixedDetector {
        fn detect(&mut self, _page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_extract_tables_keeps_detection_order() -> Result<(), LedgerscanError> {
        let page = PageImage::new(DynamicImage::new_rgb8(800, 1000), 3);
        let mut extractor = TableExtractor::new(FixedDetector(vec![
            Detection::new(Bbox::new(Vec2::new(10.5, 500.0), Vec2::new(700.9, 900.0)), 0.8),
            Detection::new(Bbox::new(Vec2::new(10.0, 50.0), Vec2::new(700.0, 400.0)), 0.9),
        ]));

        let tables = extractor.extract_tables(&page)?;

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].coordinates.to_list(), [10, 500, 700, 900]);
        assert_eq!(tables[0].page_number, 3);
        assert_eq!(tables[1].coordinates.proba, 0.9);

        // the page is borrowed, not cropped
        assert!(std::ptr::eq(tables[1].image, &page.image));
        Ok(())
    }

    #[test]
    fn test_no_tables() -> Result<(), LedgerscanError> {
        let page = PageImage::new(DynamicImage::new_rgb8(10, 10), 0);
        let mut extractor = TableExtractor::new(FixedDetector(Vec::new()));

        assert!(extractor.extract_tables(&page)?.is_empty());
        Ok(())
    }
}
