use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerscanError {
    #[snafu(display("Ort Session init stage `{}` error: {}", stage, source))]
    OrtInit {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Build Tensor for `{}` error: {}", stage, source))]
    Tensor {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Onnx Inference error: {}", source))]
    Inference { source: ort::error::Error },
    #[snafu(display("Onnx Output can not found {}", output_name))]
    NotFoundOutput { output_name: String },
    #[snafu(display("Ndarray Shape error at stage `{}`: {}", stage, source))]
    Shape {
        source: ndarray::ShapeError,
        stage: String,
    },
    #[snafu(display("Load Font `{}` error: {}", path, source))]
    Font {
        source: ab_glyph::InvalidFont,
        path: String,
    },
    #[snafu(display("Image Read `{}` error: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Image Write `{}` error: {}", path, source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Io `{}` on `{}` error: {}", stage, path, source))]
    Io {
        source: std::io::Error,
        stage: String,
        path: String,
    },
    #[snafu(display("Environment `{}` Not Found, error {}", name, source))]
    EnvNotFound {
        source: std::env::VarError,
        name: String,
    },
    #[snafu(display("Pdfium `{}` error {}", stage, source))]
    Pdfium {
        source: pdfium_render::prelude::PdfiumError,
        stage: String,
    },
    #[snafu(display("Config `{}` error: {}", path, source))]
    Config {
        source: serde_yaml::Error,
        path: String,
    },
    #[snafu(display("Missing config value `{}`", key))]
    MissingConfig { key: String },
    #[snafu(display("Decode ocr output of `{}` error: {}", program, source))]
    OcrDecode {
        source: serde_json::Error,
        program: String,
    },
    #[snafu(display("Ocr command `{}` exited with {}: {}", program, status, stderr))]
    OcrCommand {
        program: String,
        status: String,
        stderr: String,
    },
    #[snafu(display("Invalid input file `{}`: {}", path, message))]
    InvalidFile { path: String, message: String },
}
