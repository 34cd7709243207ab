use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use tracing::*;

use crate::{
    consts::*,
    error::*,
    inference::{
        paddle::{det::PaddleDetConfig, rec::PaddleRecConfig},
        yolo::YoloTableConfig,
    },
    ocr::OcrConfig,
    parse::{
        categorizer::{TransactionKeywords, default_transaction_types},
        validator::ValidationConfig,
    },
};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Full service configuration, read from YAML. Every section and field is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub ocr: OcrSection,
    pub table: TableSection,
    pub document: DocumentSection,
    pub validation: ValidationConfig,
    pub processor: ProcessorSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    #[default]
    Paddle,
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    pub x_tolerance: i32,
    pub debit_x_tolerance: i32,
    pub y_tolerance: i32,
    pub min_confidence: f32,
    pub temp_dir: PathBuf,
    pub backend: OcrBackend,
    pub det_model_path: Option<PathBuf>,
    pub rec_model_path: Option<PathBuf>,
    pub dict_path: Option<PathBuf>,
    /// `program arg..`, the image path is appended.
    pub command: Option<String>,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            x_tolerance: X_TOLERANCE,
            debit_x_tolerance: DEBIT_X_TOLERANCE,
            y_tolerance: Y_TOLERANCE,
            min_confidence: 0.0,
            temp_dir: PathBuf::from("temp"),
            backend: OcrBackend::default(),
            det_model_path: None,
            rec_model_path: None,
            dict_path: None,
            command: None,
        }
    }
}

impl OcrSection {
    pub fn extractor_config(&self) -> OcrConfig {
        OcrConfig {
            x_tolerance: self.x_tolerance,
            debit_x_tolerance: self.debit_x_tolerance,
            y_tolerance: self.y_tolerance,
            min_confidence: self.min_confidence,
            temp_dir: self.temp_dir.clone(),
        }
    }

    pub fn det_model_path(&self) -> Result<&Path, LedgerscanError> {
        self.det_model_path.as_deref().context(MissingConfigSnafu {
            key: "ocr.det_model_path",
        })
    }

    pub fn rec_model_path(&self) -> Result<&Path, LedgerscanError> {
        self.rec_model_path.as_deref().context(MissingConfigSnafu {
            key: "ocr.rec_model_path",
        })
    }

    pub fn det_config(&self) -> PaddleDetConfig {
        PaddleDetConfig::default()
    }

    pub fn rec_config(&self) -> PaddleRecConfig {
        PaddleRecConfig {
            dict_path: self.dict_path.clone(),
            ..PaddleRecConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSection {
    pub model_path: Option<PathBuf>,
    pub input_size: usize,
    pub proba_threshold: f32,
    pub iou_threshold: f32,
    /// Without a model, treat each page as one table.
    pub full_page_fallback: bool,
}

impl Default for TableSection {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: TABLE_INPUT_SIZE,
            proba_threshold: TABLE_PROBA_THRESHOLD,
            iou_threshold: TABLE_IOU_THRESHOLD,
            full_page_fallback: false,
        }
    }
}

impl TableSection {
    pub fn detector_config(&self) -> YoloTableConfig {
        YoloTableConfig {
            input_size: self.input_size,
            proba_threshold: self.proba_threshold,
            iou_threshold: self.iou_threshold,
            ..YoloTableConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSection {
    pub max_file_size_mb: u64,
    /// Accepted extensions, dot included.
    pub supported_formats: Vec<String>,
    pub output_dir: PathBuf,
    pub render_dpi: f32,
    pub password: Option<String>,
}

impl Default for DocumentSection {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            supported_formats: vec![".pdf".to_string()],
            output_dir: PathBuf::from("output"),
            render_dpi: RENDER_DPI,
            password: None,
        }
    }
}

impl DocumentSection {
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size_mb * BYTES_PER_MB
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSection {
    /// Year given to `day.month` dates, the current year when unset.
    pub statement_year: Option<i32>,
    pub transaction_types: TransactionKeywords,
}

impl Default for ProcessorSection {
    fn default() -> Self {
        Self {
            statement_year: None,
            transaction_types: default_transaction_types(),
        }
    }
}

impl ServiceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LedgerscanError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(IoSnafu {
            stage: "read-config",
            path: path.to_string_lossy(),
        })?;

        let config: ServiceConfig = serde_yaml::from_str(&content).context(ConfigSnafu {
            path: path.to_string_lossy(),
        })?;
        debug!("loaded config from {}", path.display());

        Ok(config)
    }

    /// Checks the extension and size of an input file.
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> Result<(), LedgerscanError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        if !self
            .document
            .supported_formats
            .iter()
            .any(|format| format.eq_ignore_ascii_case(&extension))
        {
            return InvalidFileSnafu {
                path: path.to_string_lossy(),
                message: format!("unsupported format `{extension}`"),
            }
            .fail();
        }

        let metadata = std::fs::metadata(path).context(IoSnafu {
            stage: "stat-input",
            path: path.to_string_lossy(),
        })?;
        if !metadata.is_file() {
            return InvalidFileSnafu {
                path: path.to_string_lossy(),
                message: "not a regular file",
            }
            .fail();
        }
        if metadata.len() > self.document.max_file_size() {
            return InvalidFileSnafu {
                path: path.to_string_lossy(),
                message: format!(
                    "file is {} bytes, limit is {} MB",
                    metadata.len(),
                    self.document.max_file_size_mb
                ),
            }
            .fail();
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), LedgerscanError> {
        for dir in [&self.ocr.temp_dir, &self.document.output_dir] {
            std::fs::create_dir_all(dir).context(IoSnafu {
                stage: "create-dir",
                path: dir.to_string_lossy(),
            })?;
        }
        Ok(())
    }

    /// Removes the temporary directory, ignoring a missing one.
    pub fn cleanup(&self) {
        match std::fs::remove_dir_all(&self.ocr.temp_dir) {
            Ok(()) => debug!("removed {}", self.ocr.temp_dir.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!("cleanup of {} failed: {}", self.ocr.temp_dir.display(), err),
        }
    }
}
