use std::path::{Path, PathBuf};

use image::{DynamicImage, imageops::FilterType};
use ndarray::prelude::*;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt};
use tracing::*;

use crate::{
    error::*,
    inference::model::{Model, OnnxSession, commit},
};

/// PP-OCR text line recognizer (CTC head).
pub struct PaddleRec {
    model_path: PathBuf,
    config: PaddleRecConfig,
}

#[derive(Debug, Clone)]
pub struct PaddleRecConfig {
    /// Height every line crop is resized to, width follows the aspect ratio.
    pub required_height: usize,
    pub batch_size: usize,
    pub input_channels: usize,
    /// Dictionary file, one symbol per line. Falls back to the `character`
    /// entry of the model metadata.
    pub dict_path: Option<PathBuf>,
}

impl Default for PaddleRecConfig {
    fn default() -> Self {
        Self {
            required_height: 48,
            batch_size: 1,
            input_channels: 3,
            dict_path: None,
        }
    }
}

impl PaddleRec {
    pub fn new(model_path: impl Into<PathBuf>, config: PaddleRecConfig) -> Self {
        Self {
            model_path: model_path.into(),
            config,
        }
    }
}

impl Model for PaddleRec {
    type Input = Array4<f32>;
    /// `[timesteps, classes]`
    type Output = Array2<f32>;
    type Config = PaddleRecConfig;

    const INPUT_NAME: &'static str = "x";
    const OUTPUT_NAME: &'static str = "fetch_name_0";
    const MODEL_NAME: &'static str = "PP-OCR_rec";

    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

/// Recognized text of one line crop with its mean character probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
}

pub struct PaddleRecSession {
    session: Session,
    model: PaddleRec,
    character_dict: Vec<String>,
}

impl PaddleRecSession {
    pub fn new(session: SessionBuilder, model: PaddleRec) -> Result<Self, LedgerscanError> {
        let session = commit(session, &model)?;

        let symbols = match &model.config().dict_path {
            Some(path) => std::fs::read_to_string(path).context(IoSnafu {
                stage: "read-dict",
                path: path.to_string_lossy(),
            })?,
            None => session
                .metadata()
                .ok()
                .and_then(|metadata| metadata.custom("character").ok().flatten())
                .context(MissingConfigSnafu {
                    key: "ocr.dict_path",
                })?,
        };
        let character_dict = build_dict(&symbols);
        debug!("recognizer dictionary has {} symbols", character_dict.len());

        Ok(Self {
            session,
            model,
            character_dict,
        })
    }
}

/// Blank at index 0, the symbols in file order, then the space class.
pub fn build_dict(symbols: &str) -> Vec<String> {
    let mut character_dict = Vec::with_capacity(symbols.len() + 2);
    character_dict.push("#".to_string());
    character_dict.extend(
        symbols
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .map(str::to_string),
    );
    character_dict.push(" ".to_string());
    character_dict
}

/// Greedy CTC decoding: best class per timestep, repeats collapsed, blanks
/// dropped.
pub fn ctc_decode(output: ArrayView2<f32>, character_dict: &[String]) -> Recognition {
    let mut text = String::new();
    let mut probas = Vec::new();
    let mut prev_idx = None;

    for timestep in output.axis_iter(Axis(0)) {
        let Some((idx, &proba)) = timestep
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if idx != 0 && Some(idx) != prev_idx {
            if let Some(symbol) = character_dict.get(idx) {
                text.push_str(symbol);
                probas.push(proba);
            }
        }
        prev_idx = Some(idx);
    }

    let confidence = if probas.is_empty() {
        0.0
    } else {
        probas.iter().sum::<f32>() / probas.len() as f32
    };

    Recognition { text, confidence }
}

impl OnnxSession<PaddleRec> for PaddleRecSession {
    type Output = Recognition;
    type Extra = ();

    fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<<PaddleRec as Model>::Input, LedgerscanError> {
        let config = self.model.config();
        let img_src = image.to_rgb8();

        let scale = config.required_height as f32 / img_src.height().max(1) as f32;
        let dst_width = ((img_src.width() as f32 * scale) as u32).max(1);

        let resized = image::imageops::resize(
            &img_src,
            dst_width,
            config.required_height as u32,
            FilterType::Triangle,
        );

        let mut input_tensor = Array4::zeros([
            config.batch_size,
            config.input_channels,
            resized.height() as usize,
            resized.width() as usize,
        ]);

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
        output: <PaddleRec as Model>::Output,
        _extra: Self::Extra,
    ) -> Result<Self::Output, LedgerscanError> {
        Ok(ctc_decode(output.view(), &self.character_dict))
    }

    fn infer(
        &mut self,
        input: <PaddleRec as Model>::Input,
        input_name: &str,
        output_name: &str,
    ) -> Result<<PaddleRec as Model>::Output, LedgerscanError> {
        let output = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu{stage: "recognize-input"})?
            ])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu {
                stage: "recognize-extract",
            })?;

        // `[1, timesteps, classes]`
        let shape = tensor.shape();
        let (steps, classes) = match shape {
            [.., steps, classes] => (*steps, *classes),
            _ => (0, 0),
        };
        let output = tensor
            .to_shape((steps, classes))
            .context(ShapeSnafu { stage: "recognize" })?
            .to_owned();

        Ok(output)
    }
}
