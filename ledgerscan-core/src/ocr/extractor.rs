use std::path::PathBuf;

use image::{DynamicImage, ImageFormat};
use snafu::ResultExt;
use tempfile::NamedTempFile;
use tracing::*;

use crate::{
    analysis::cluster::{ClusterConfig, WordClusterer},
    consts::{DEBIT_X_TOLERANCE, X_TOLERANCE, Y_TOLERANCE},
    error::*,
    layout::{
        element::{BoundingBox, Line, Word},
        table::{TableBox, clamp_region},
    },
    ocr::{
        OcrEngine,
        debit::{apply_debit_sign, find_debit_column},
        result::{OcrDocument, OcrWord},
    },
};

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub x_tolerance: i32,
    pub debit_x_tolerance: i32,
    pub y_tolerance: i32,
    /// Words scored below this are dropped before clustering.
    pub min_confidence: f32,
    /// Where region crops are written for the OCR backend.
    pub temp_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            x_tolerance: X_TOLERANCE,
            debit_x_tolerance: DEBIT_X_TOLERANCE,
            y_tolerance: Y_TOLERANCE,
            min_confidence: 0.0,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Region OCR adapter: crops a table out of a page, runs the OCR backend on
/// the crop and brings the words back into page coordinates as clustered
/// lines.
pub struct OcrExtractor<E: OcrEngine> {
    engine: E,
    config: OcrConfig,
    clusterer: WordClusterer,
}

impl<E: OcrEngine> OcrExtractor<E> {
    pub fn new(engine: E, config: OcrConfig) -> Self {
        let clusterer = WordClusterer::new(ClusterConfig {
            x_tolerance: config.x_tolerance,
            y_tolerance: config.y_tolerance,
        });

        Self {
            engine,
            config,
            clusterer,
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Lines of one table region, top to bottom.
    ///
    /// A region with no area gives no lines. Backend failures are returned
    /// to the caller.
    #[tracing::instrument(skip_all, fields(page = table.page_number, bbox = ?table.to_list()))]
    pub fn extract_text_from_region(
        &mut self,
        image: &DynamicImage,
        table: &TableBox,
    ) -> Result<Vec<Line>, LedgerscanError> {
        let Some(region) = clamp_region(image, &table.bbox) else {
            warn!("skip degenerate table region {:?}", table.to_list());
            return Ok(Vec::new());
        };

        let crop_file = self.prepare_region(image, &region)?;
        let document = self.engine.recognize(crop_file.path())?;
        drop(crop_file);

        let words = self.page_words(&document, &region);
        let debit_x = find_debit_column(&words);
        if let Some(debit_x) = debit_x {
            debug!("debit column found at x={}", debit_x);
        }
        let words = apply_debit_sign(words, debit_x, self.config.debit_x_tolerance);

        let lines = self.clusterer.cluster(words);
        debug!("region produced {} lines", lines.len());

        Ok(lines)
    }

    /// Writes the region crop to a temporary file removed on drop.
    fn prepare_region(
        &self,
        image: &DynamicImage,
        region: &BoundingBox,
    ) -> Result<NamedTempFile, LedgerscanError> {
        let temp_dir = &self.config.temp_dir;
        std::fs::create_dir_all(temp_dir).context(IoSnafu {
            stage: "create-temp-dir",
            path: temp_dir.to_string_lossy(),
        })?;

        let crop_file = tempfile::Builder::new()
            .prefix("region-")
            .suffix(".png")
            .tempfile_in(temp_dir)
            .context(IoSnafu {
                stage: "create-region-file",
                path: temp_dir.to_string_lossy(),
            })?;

        let crop = image.crop_imm(
            region.x1 as u32,
            region.y1 as u32,
            region.width() as u32,
            region.height() as u32,
        );
        crop.save_with_format(crop_file.path(), ImageFormat::Png)
            .context(ImageWriteSnafu {
                path: crop_file.path().to_string_lossy(),
            })?;

        Ok(crop_file)
    }

    /// Backend words re-projected into page pixels, low confidence ones
    /// dropped.
    fn page_words(&self, document: &OcrDocument, region: &BoundingBox) -> Vec<Word> {
        document
            .words()
            .filter(|word| word.confidence >= self.config.min_confidence)
            .map(|word| to_page_word(word, region))
            .collect()
    }
}

/// Maps normalized crop geometry onto the page: `x_abs = x1 + round(gx * width)`.
pub fn to_page_word(word: &OcrWord, region: &BoundingBox) -> Word {
    let width = region.width() as f32;
    let height = region.height() as f32;
    let [[gx0, gy0], [gx1, gy1]] = word.geometry;

    let project = |origin: i32, extent: f32, ratio: f32| {
        origin + (ratio.clamp(0.0, 1.0) * extent).round_ties_even() as i32
    };

    Word::new(
        word.value.clone(),
        word.confidence,
        BoundingBox::new(
            project(region.x1, width, gx0),
            project(region.y1, height, gy0),
            project(region.x1, width, gx1),
            project(region.y1, height, gy1),
        ),
    )
}
