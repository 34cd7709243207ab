use std::{ops::Range, path::PathBuf};

use derive_builder::Builder;
use glam::Vec2;
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use snafu::ResultExt;
use tracing::*;

use crate::{
    consts::{PDF_POINTS_PER_INCH, PDFIUM_LIB_PATH_ENV_NAME},
    error::*,
    layout::page::PageImage,
};

/// A statement to process.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Pdf {
    pub path: PathBuf,
    #[builder(default)]
    pub password: Option<String>,
    /// Zero based page range, every page when unset.
    #[builder(default)]
    pub range: Option<Range<u16>>,
}

impl Pdf {
    /// File name shown in results.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Rasterizes the pages of a PDF, in physical order.
pub trait PageRenderer {
    fn render(&mut self, pdf: &Pdf) -> Result<Vec<PageImage>, LedgerscanError>;
}

impl<T: PageRenderer + ?Sized> PageRenderer for Box<T> {
    fn render(&mut self, pdf: &Pdf) -> Result<Vec<PageImage>, LedgerscanError> {
        (**self).render(pdf)
    }
}

pub struct PdfiumRenderer {
    pdfium: Pdfium,
    dpi: f32,
}

impl PdfiumRenderer {
    /// Binds the pdfium library found in the directory named by
    /// `PDFIUM_DYNAMIC_LIB_PATH`.
    pub fn new(dpi: f32) -> Result<Self, LedgerscanError> {
        let pdfium_lib_path =
            std::env::var(PDFIUM_LIB_PATH_ENV_NAME).context(EnvNotFoundSnafu {
                name: PDFIUM_LIB_PATH_ENV_NAME,
            })?;

        let pdfium = Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &pdfium_lib_path,
            ))
            .context(PdfiumSnafu {
                stage: "load-dyn-lib",
            })?,
        );

        Ok(Self { pdfium, dpi })
    }

    /// Pixels per PDF point.
    pub fn scale(&self) -> f32 {
        self.dpi / PDF_POINTS_PER_INCH
    }
}

impl PageRenderer for PdfiumRenderer {
    #[tracing::instrument(skip_all, fields(pdf = %pdf.path.display()))]
    fn render(&mut self, pdf: &Pdf) -> Result<Vec<PageImage>, LedgerscanError> {
        let document = self
            .pdfium
            .load_pdf_from_file(&pdf.path, pdf.password.as_deref())
            .context(PdfiumSnafu {
                stage: "load-pdf-by-path",
            })?;

        let page_count = document.pages().len();
        let range = pdf.range.clone().unwrap_or(0..page_count);
        let scale = self.scale();
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut pages = Vec::new();
        for (page_no, page) in document
            .pages()
            .iter()
            .enumerate()
            .skip(range.start as usize)
            .take(range.len())
        {
            let pdf_size = Vec2::new(page.width().value, page.height().value);
            let image = page
                .render_with_config(&render_config)
                .context(PdfiumSnafu { stage: "render" })?
                .as_image();
            debug!(
                "rendered page {} at {}x{}",
                page_no,
                image.width(),
                image.height()
            );

            pages.push(PageImage {
                image,
                page_no,
                scale,
                pdf_size,
            });
        }

        info!("rendered {} of {} pages", pages.len(), page_count);
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_builder() -> Result<(), Box<dyn std::error::Error>> {
        let pdf = PdfBuilder::default()
            .path("/data/releve-2024-06.pdf")
            .password(Some("secret".to_string()))
            .build()?;

        assert_eq!(pdf.filename(), "releve-2024-06.pdf");
        assert_eq!(pdf.password.as_deref(), Some("secret"));
        assert!(pdf.range.is_none());

        assert!(PdfBuilder::default().build().is_err());
        Ok(())
    }
}
