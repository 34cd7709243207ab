use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use snafu::ResultExt;
use tracing::*;

use crate::{consts::TABLE_COLORS, error::*, layout::table::TableBox};

const BORDER_WIDTH: i32 = 3;
const LABEL_SCALE: f32 = 24.0;

/// Draws detected tables on top of their page for inspection.
#[derive(Default)]
pub struct TableVisualizer {
    font: Option<FontVec>,
}

impl TableVisualizer {
    /// Boxes only, no labels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels every box with `Table N` using the TrueType font at `path`.
    pub fn with_font<P: AsRef<Path>>(path: P) -> Result<Self, LedgerscanError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(IoSnafu {
            stage: "read-font",
            path: path.to_string_lossy(),
        })?;
        let font = FontVec::try_from_vec(bytes).context(FontSnafu {
            path: path.to_string_lossy(),
        })?;

        Ok(Self { font: Some(font) })
    }

    /// Page copy with one colored rectangle per table, colors cycling
    /// through red, green, blue, yellow and magenta.
    pub fn draw(&self, image: &DynamicImage, tables: &[TableBox]) -> RgbImage {
        let mut canvas = image.to_rgb8();

        for (idx, table) in tables.iter().enumerate() {
            let bbox = table.bbox;
            if bbox.width() <= 0 || bbox.height() <= 0 {
                continue;
            }
            let color = Rgb(TABLE_COLORS[idx % TABLE_COLORS.len()]);

            for offset in 0..BORDER_WIDTH {
                let rect = Rect::at(bbox.x1 - offset, bbox.y1 - offset).of_size(
                    (bbox.width() + offset * 2) as u32,
                    (bbox.height() + offset * 2) as u32,
                );
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            if let Some(font) = &self.font {
                let label = format!("Table {}", idx + 1);
                let text_y = (bbox.y1 - LABEL_SCALE as i32 - BORDER_WIDTH).max(0);
                draw_text_mut(
                    &mut canvas,
                    color,
                    bbox.x1.max(0),
                    text_y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &label,
                );
            }
        }

        canvas
    }

    /// Draws and writes the overlay to `output`.
    pub fn save<P: AsRef<Path>>(
        &self,
        image: &DynamicImage,
        tables: &[TableBox],
        output: P,
    ) -> Result<(), LedgerscanError> {
        let output = output.as_ref();
        self.draw(image, tables).save(output).context(ImageWriteSnafu {
            path: output.to_string_lossy(),
        })?;
        debug!("wrote {} table boxes to {}", tables.len(), output.display());

        Ok(())
    }
}
