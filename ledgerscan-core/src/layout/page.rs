use glam::Vec2;
use image::DynamicImage;

/// One rasterized PDF page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: DynamicImage,
    /// zero based, in physical page order
    pub page_no: usize,
    /// pixels per PDF point
    pub scale: f32,
    /// page size in PDF points
    pub pdf_size: Vec2,
}

impl PageImage {
    pub fn new(image: DynamicImage, page_no: usize) -> Self {
        let pdf_size = Vec2::new(image.width() as f32, image.height() as f32);
        Self {
            image,
            page_no,
            scale: 1.0,
            pdf_size,
        }
    }

    pub fn image_size(&self) -> Vec2 {
        Vec2::new(self.image.width() as f32, self.image.height() as f32)
    }
}
