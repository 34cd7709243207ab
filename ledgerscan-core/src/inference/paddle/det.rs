use std::path::{Path, PathBuf};

use glam::Vec2;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, imageops::FilterType};
use imageproc::contours::{BorderType, find_contours};
use ndarray::prelude::*;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt};

use crate::{
    analysis::bbox::Bbox,
    error::*,
    inference::model::{Model, OnnxSession, commit},
};

/// PP-OCR text line detector (DB head).
pub struct PaddleDet {
    model_path: PathBuf,
    config: PaddleDetConfig,
}

#[derive(Debug, Clone)]
pub struct PaddleDetConfig {
    /// Side of the square canvas the page is resized into.
    pub input_size: usize,
    pub batch_size: usize,
    pub input_channels: usize,
    /// Fill of the canvas outside the resized image, in normalized space.
    pub background_fill_value: f32,
    /// Probability above which a map pixel is text.
    pub det_db_thresh: f32,
    /// Minimum mean probability of a kept box.
    pub det_db_box_thresh: f32,
    /// Growth of a box relative to `area / perimeter`.
    pub det_db_unclip_ratio: f32,
    /// Shorter side, in map pixels, below which a box is noise.
    pub min_side: f32,
    pub max_candidates: usize,
}

impl Default for PaddleDetConfig {
    fn default() -> Self {
        Self {
            input_size: 960,
            batch_size: 1,
            input_channels: 3,
            background_fill_value: 0.0,
            det_db_thresh: 0.3,
            det_db_box_thresh: 0.6,
            det_db_unclip_ratio: 1.5,
            min_side: 3.0,
            max_candidates: 1000,
        }
    }
}

impl PaddleDet {
    pub fn new(model_path: impl Into<PathBuf>, config: PaddleDetConfig) -> Self {
        Self {
            model_path: model_path.into(),
            config,
        }
    }
}

impl Model for PaddleDet {
    type Input = Array4<f32>;
    /// Probability map `[height, width]`.
    type Output = Array2<f32>;
    type Config = PaddleDetConfig;

    const INPUT_NAME: &'static str = "x";
    const OUTPUT_NAME: &'static str = "fetch_name_0";
    const MODEL_NAME: &'static str = "PP-OCR_det";

    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

/// A detected text line in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDetection {
    pub bbox: Bbox,
    pub proba: f32,
}

/// Source image size against the part of the canvas it was resized into.
#[derive(Debug, Clone, Copy)]
pub struct DetExtra {
    pub original_shape: (u32, u32),
    pub resized_shape: (u32, u32),
}

pub struct PaddleDetSession {
    session: Session,
    model: PaddleDet,
}

impl PaddleDetSession {
    pub fn new(session: SessionBuilder, model: PaddleDet) -> Result<Self, LedgerscanError> {
        let session = commit(session, &model)?;
        Ok(Self { session, model })
    }

    /// Text lines of the whole image, top to bottom.
    pub fn detect_text_lines(
        &mut self,
        image: &DynamicImage,
    ) -> Result<Vec<TextDetection>, LedgerscanError> {
        let (orig_w, orig_h) = image.dimensions();
        let extra = DetExtra {
            original_shape: (orig_w, orig_h),
            resized_shape: resized_shape(orig_w, orig_h, self.model.config().input_size),
        };

        self.run(image, extra)
    }
}

fn resized_shape(width: u32, height: u32, input_size: usize) -> (u32, u32) {
    let scale = f32::min(
        input_size as f32 / width as f32,
        input_size as f32 / height as f32,
    );
    let new_w = ((width as f32 * scale) as u32).clamp(1, input_size as u32);
    let new_h = ((height as f32 * scale) as u32).clamp(1, input_size as u32);
    (new_w, new_h)
}

impl OnnxSession<PaddleDet> for PaddleDetSession {
    type Output = Vec<TextDetection>;
    type Extra = DetExtra;

    fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<<PaddleDet as Model>::Input, LedgerscanError> {
        let config = self.model.config();
        let (orig_w, orig_h) = image.dimensions();
        let (new_w, new_h) = resized_shape(orig_w, orig_h, config.input_size);

        let resized = image::imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);

        let mut input_tensor = Array4::from_elem(
            [
                config.batch_size,
                config.input_channels,
                config.input_size,
                config.input_size,
            ],
            config.background_fill_value,
        );

        for (x, y, pixel) in resized.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = pixel.0;
            input_tensor[[0, 0, y, x]] = (r as f32 / 255.0 - 0.5) / 0.5;
            input_tensor[[0, 1, y, x]] = (g as f32 / 255.0 - 0.5) / 0.5;
            input_tensor[[0, 2, y, x]] = (b as f32 / 255.0 - 0.5) / 0.5;
        }

        Ok(input_tensor)
    }

    fn postprocess(
        &self,
        output: <PaddleDet as Model>::Output,
        extra: Self::Extra,
    ) -> Result<Self::Output, LedgerscanError> {
        Ok(db_postprocess(output.view(), self.model.config(), &extra))
    }

    fn infer(
        &mut self,
        input: <PaddleDet as Model>::Input,
        input_name: &str,
        output_name: &str,
    ) -> Result<<PaddleDet as Model>::Output, LedgerscanError> {
        let output = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu{stage: "detect-input"})?
            ])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu {
                stage: "detect-extract",
            })?;

        // `[1, 1, h, w]`, only the last two axes matter
        let shape = tensor.shape();
        let (h, w) = match shape {
            [.., h, w] => (*h, *w),
            _ => (0, 0),
        };
        let map = Array2::from_shape_vec((h, w), tensor.iter().copied().take(h * w).collect())
            .context(ShapeSnafu { stage: "detect" })?;

        Ok(map)
    }
}

/// DB post-processing: binarize the probability map, trace the outer
/// contours, score each bounding rectangle on the raw map, grow it by
/// `area * unclip_ratio / perimeter` and map it back to source pixels.
pub fn db_postprocess(
    prob_map: ArrayView2<f32>,
    config: &PaddleDetConfig,
    extra: &DetExtra,
) -> Vec<TextDetection> {
    let (h, w) = prob_map.dim();
    let (resized_w, resized_h) = extra.resized_shape;
    let map_w = (resized_w as usize).min(w);
    let map_h = (resized_h as usize).min(h);
    if map_w == 0 || map_h == 0 {
        return Vec::new();
    }

    let mut mask = GrayImage::new(map_w as u32, map_h as u32);
    for y in 0..map_h {
        for x in 0..map_w {
            if prob_map[[y, x]] > config.det_db_thresh {
                mask.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }

    let ratio = Vec2::new(
        extra.original_shape.0 as f32 / resized_w as f32,
        extra.original_shape.1 as f32 / resized_h as f32,
    );
    let bounds = Vec2::new(extra.original_shape.0 as f32, extra.original_shape.1 as f32);

    let mut detections = Vec::new();
    for contour in find_contours::<i32>(&mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .take(config.max_candidates)
    {
        let Some(rect) = bounding_rect(&contour.points) else {
            continue;
        };
        if rect.width().min(rect.height()) < config.min_side {
            continue;
        }

        let score = box_score(prob_map, &rect);
        if score < config.det_db_box_thresh {
            continue;
        }

        let unclipped = unclip(&rect, config.det_db_unclip_ratio);
        if unclipped.width().min(unclipped.height()) < config.min_side + 2.0 {
            continue;
        }

        let bbox = Bbox::new(unclipped.min * ratio, unclipped.max * ratio).clamp(Vec2::ZERO, bounds);
        if bbox.is_empty() {
            continue;
        }

        detections.push(TextDetection { bbox, proba: score });
    }

    detections.sort_by(|a, b| {
        a.bbox
            .min
            .y
            .total_cmp(&b.bbox.min.y)
            .then(a.bbox.min.x.total_cmp(&b.bbox.min.x))
    });
    detections
}

/// Pixel-inclusive bounding rectangle of contour points.
fn bounding_rect(points: &[imageproc::point::Point<i32>]) -> Option<Bbox> {
    let first = points.first()?;
    let (mut min, mut max) = (
        Vec2::new(first.x as f32, first.y as f32),
        Vec2::new(first.x as f32, first.y as f32),
    );
    for point in points {
        let point = Vec2::new(point.x as f32, point.y as f32);
        min = min.min(point);
        max = max.max(point);
    }
    Some(Bbox::new(min, max + Vec2::ONE))
}

/// Mean probability inside the rectangle.
fn box_score(prob_map: ArrayView2<f32>, rect: &Bbox) -> f32 {
    let (h, w) = prob_map.dim();
    let x1 = (rect.min.x.max(0.0) as usize).min(w);
    let y1 = (rect.min.y.max(0.0) as usize).min(h);
    let x2 = (rect.max.x.max(0.0) as usize).min(w);
    let y2 = (rect.max.y.max(0.0) as usize).min(h);
    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    prob_map
        .slice(s![y1..y2, x1..x2])
        .mean()
        .unwrap_or(0.0)
}

fn unclip(rect: &Bbox, unclip_ratio: f32) -> Bbox {
    let perimeter = 2.0 * (rect.width() + rect.height());
    if perimeter <= 0.0 {
        return *rect;
    }
    rect.expand(rect.area() * unclip_ratio / perimeter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_postprocess_finds_text_line() {
        let mut map = Array2::<f32>::zeros((100, 200));
        map.slice_mut(s![40..50, 20..120]).fill(0.9);
        let config = PaddleDetConfig::default();
        // map covers a 400 x 200 source image
        let extra = DetExtra {
            original_shape: (400, 200),
            resized_shape: (200, 100),
        };

        let detections = db_postprocess(map.view(), &config, &extra);

        assert_eq!(detections.len(), 1);
        let detection = detections[0];
        assert!((detection.proba - 0.9).abs() < 1e-5);
        // 100 x 10 rect grows by 1000 * 1.5 / 220 on every side, then doubles
        let grow = 1000.0 * 1.5 / 220.0;
        assert!((detection.bbox.min.x - (20.0 - grow) * 2.0).abs() < 1e-3);
        assert!((detection.bbox.max.y - (50.0 + grow) * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_db_postprocess_drops_noise() {
        let mut map = Array2::<f32>::zeros((50, 50));
        // too thin
        map.slice_mut(s![10..12, 5..45]).fill(0.95);
        // above the pixel threshold but weak on average
        map.slice_mut(s![20..40, 10..40]).fill(0.4);
        let extra = DetExtra {
            original_shape: (50, 50),
            resized_shape: (50, 50),
        };

        assert!(db_postprocess(map.view(), &PaddleDetConfig::default(), &extra).is_empty());
    }

    #[test]
    fn test_resized_shape_keeps_aspect() {
        assert_eq!(resized_shape(1920, 960, 960), (960, 480));
        assert_eq!(resized_shape(100, 400, 960), (240, 960));
    }
}
