use glam::Vec2;
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ndarray::prelude::*;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt};
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    error::*,
    inference::{
        model::{Model, OnnxSession, commit},
        yolo::model::{YoloTable, YoloTableConfig},
    },
    layout::page::PageImage,
    table::{Detection, TableDetector},
};

pub struct YoloTableSession {
    session: Session,
    model: YoloTable,
}

/// Geometry needed to bring network boxes back to page pixels.
#[derive(Debug, Clone, Copy)]
pub struct PageMeta {
    pub image_size: Vec2,
    /// network pixels per page pixel
    pub scale: f32,
}

impl YoloTableSession {
    pub fn new(session: SessionBuilder, model: YoloTable) -> Result<Self, LedgerscanError> {
        let session = commit(session, &model)?;
        Ok(Self { session, model })
    }
}

impl OnnxSession<YoloTable> for YoloTableSession {
    type Output = Vec<Detection>;
    type Extra = PageMeta;

    fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<<YoloTable as Model>::Input, LedgerscanError> {
        Ok(resize_into_canvas(image, self.model.config()))
    }

    fn postprocess(
        &self,
        output: <YoloTable as Model>::Output,
        extra: Self::Extra,
    ) -> Result<Self::Output, LedgerscanError> {
        let config = self.model.config();
        let mut detections = extract_candidates(output.view(), config, &extra);
        merge_overlapping(&mut detections, config.iou_threshold);
        sort_top_to_bottom(&mut detections);

        Ok(detections)
    }

    fn infer(
        &mut self,
        input: <YoloTable as Model>::Input,
        input_name: &str,
        output_name: &str,
    ) -> Result<<YoloTable as Model>::Output, LedgerscanError> {
        let output = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu{stage: "input"})?
            ])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu { stage: "extract" })?;

        let output = tensor
            .to_owned()
            .into_dimensionality::<Ix3>()
            .context(ShapeSnafu { stage: "output" })?;

        Ok(output)
    }
}

impl TableDetector for YoloTableSession {
    #[tracing::instrument(skip_all, fields(page = page.page_no))]
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
        let (width, height) = page.image.dimensions();
        let extra = PageMeta {
            image_size: Vec2::new(width as f32, height as f32),
            scale: fit_scale(width, height, self.model.config().input_size),
        };

        let detections = self.run(&page.image, extra)?;
        debug!("detected {} tables", detections.len());

        Ok(detections)
    }
}

/// Ratio that fits a `width` x `height` image inside the square input.
fn fit_scale(width: u32, height: u32, input_size: usize) -> f32 {
    let target = input_size as f32;
    f32::min(target / width as f32, target / height as f32)
}

/// Aspect preserving resize into the top-left corner of a gray square
/// canvas, RGB scaled to `[0, 1]`.
pub fn resize_into_canvas(image: &DynamicImage, config: &YoloTableConfig) -> Array4<f32> {
    let (w0, h0) = image.dimensions();
    let scale = fit_scale(w0, h0, config.input_size);
    let w_new = ((w0 as f32 * scale).round() as u32).clamp(1, config.input_size as u32);
    let h_new = ((h0 as f32 * scale).round() as u32).clamp(1, config.input_size as u32);

    let resized = image.resize_exact(w_new, h_new, FilterType::Triangle);

    let mut input_tensor = Array4::from_elem(
        [
            config.batch_size,
            config.input_channels,
            config.input_size,
            config.input_size,
        ],
        config.background_fill_value,
    );

    for (x, y, pixel) in resized.pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b, _] = pixel.0;
        input_tensor[[0, 0, y, x]] = r as f32 / 255.0;
        input_tensor[[0, 1, y, x]] = g as f32 / 255.0;
        input_tensor[[0, 2, y, x]] = b as f32 / 255.0;
    }

    input_tensor
}

/// Best class of every candidate above the threshold, in page pixels.
pub fn extract_candidates(
    output: ArrayView3<f32>,
    config: &YoloTableConfig,
    extra: &PageMeta,
) -> Vec<Detection> {
    let output: ArrayView2<f32> = output.slice(s![0, .., ..]);
    let canvas = extra.image_size * extra.scale;

    let mut detections = Vec::new();
    for prediction in output.axis_iter(Axis(1)) {
        let Some(&proba) = prediction
            .slice(s![config.cxywh_size..])
            .iter()
            .max_by(|a, b| a.total_cmp(b))
        else {
            continue;
        };

        if proba < config.proba_threshold {
            continue;
        }

        let center = Vec2::new(prediction[0], prediction[1]);
        let size = Vec2::new(prediction[2], prediction[3]);
        let bbox = Bbox::from_center_size(center, size)
            .clamp(Vec2::ZERO, canvas)
            .scale(1. / extra.scale);

        if bbox.is_empty() {
            continue;
        }

        detections.push(Detection::new(bbox, proba));
    }

    detections
}

/// Confidence ordered suppression: a candidate overlapping an already kept
/// box by more than `iou_threshold` is folded into it.
pub fn merge_overlapping(detections: &mut Vec<Detection>, iou_threshold: f32) {
    if detections.len() < 2 {
        return;
    }

    detections.sort_by(|a, b| b.proba.total_cmp(&a.proba));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections.drain(..) {
        match kept
            .iter_mut()
            .find(|other| detection.bbox.overlap_ratio(&other.bbox) > iou_threshold)
        {
            Some(other) => other.bbox = other.bbox.union(&detection.bbox),
            None => kept.push(detection),
        }
    }

    *detections = kept;
}

fn sort_top_to_bottom(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        a.bbox
            .min
            .y
            .total_cmp(&b.bbox.min.y)
            .then(a.bbox.min.x.total_cmp(&b.bbox.min.x))
    });
}
