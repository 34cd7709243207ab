use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4};

use crate::{
    consts::{
        BACKGROUND_FILL_VALUE, CXYWH_OFFSET, TABLE_INPUT_SIZE, TABLE_IOU_THRESHOLD,
        TABLE_PROBA_THRESHOLD,
    },
    inference::model::Model,
};

/// YOLO table detection network exported to ONNX.
pub struct YoloTable {
    model_path: PathBuf,
    config: YoloTableConfig,
}

pub type YoloTableInput = Array4<f32>;
/// `[batch, 4 + classes, candidates]`
pub type YoloTableOutput = Array3<f32>;

#[derive(Debug, Clone)]
pub struct YoloTableConfig {
    /// Side of the square network input.
    pub input_size: usize,
    pub batch_size: usize,
    pub input_channels: usize,
    pub background_fill_value: f32,
    pub cxywh_size: usize,
    pub proba_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for YoloTableConfig {
    fn default() -> Self {
        Self {
            input_size: TABLE_INPUT_SIZE,
            batch_size: 1,
            input_channels: 3,
            background_fill_value: BACKGROUND_FILL_VALUE,
            cxywh_size: CXYWH_OFFSET,
            proba_threshold: TABLE_PROBA_THRESHOLD,
            iou_threshold: TABLE_IOU_THRESHOLD,
        }
    }
}

impl YoloTable {
    pub fn new(model_path: impl Into<PathBuf>, config: YoloTableConfig) -> Self {
        Self {
            model_path: model_path.into(),
            config,
        }
    }
}

impl Model for YoloTable {
    type Input = YoloTableInput;
    type Output = YoloTableOutput;
    type Config = YoloTableConfig;

    const INPUT_NAME: &'static str = "images";
    const OUTPUT_NAME: &'static str = "output0";
    const MODEL_NAME: &'static str = "yolov8-table";

    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
