use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::*;
use tracing_subscriber::EnvFilter;

use ledgerscan_core::{
    DocumentProcessor, ServiceConfig,
    config::OcrBackend,
    inference::{
        model::session_builder,
        paddle::{PaddleOcr, det::PaddleDet, rec::PaddleRec},
        yolo::{YoloTable, YoloTableSession},
    },
    ocr::{OcrEngine, command::CommandOcr},
    parse::render::PdfiumRenderer,
    table::{FullPageDetector, TableDetector, visualize::TableVisualizer},
};

#[derive(Parser)]
#[command(name = "ledgerscan")]
#[command(about = "Extract transactions from a bank statement PDF")]
struct Args {
    #[arg(help = "Input PDF file path")]
    pdf: PathBuf,

    #[arg(short, long, help = "YAML configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Statement year, overrides the configuration")]
    year: Option<i32>,

    #[arg(short, long, help = "Write the JSON result here instead of stdout")]
    output: Option<PathBuf>,

    #[arg(long, help = "Save table overlays of every page into this directory")]
    visualize: Option<PathBuf>,

    #[arg(long, help = "Font used to label table overlays")]
    font: Option<PathBuf>,

    #[arg(long, help = "Password of an encrypted PDF")]
    password: Option<String>,

    #[arg(long, help = "Log as JSON lines")]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn table_detector(config: &ServiceConfig) -> anyhow::Result<Box<dyn TableDetector>> {
    match &config.table.model_path {
        Some(path) => {
            let model = YoloTable::new(path, config.table.detector_config());
            let session = YoloTableSession::new(session_builder()?, model)?;
            Ok(Box::new(session))
        }
        None if config.table.full_page_fallback => {
            warn!("no table model configured, using whole pages");
            Ok(Box::new(FullPageDetector))
        }
        None => bail!("set `table.model_path` or enable `table.full_page_fallback`"),
    }
}

fn ocr_engine(config: &ServiceConfig) -> anyhow::Result<Box<dyn OcrEngine>> {
    let ocr = &config.ocr;
    match ocr.backend {
        OcrBackend::Paddle => {
            let det = PaddleDet::new(ocr.det_model_path()?, ocr.det_config());
            let rec = PaddleRec::new(ocr.rec_model_path()?, ocr.rec_config());
            Ok(Box::new(PaddleOcr::new(det, rec)?))
        }
        OcrBackend::Command => {
            let command = ocr.command.as_deref().unwrap_or_default();
            Ok(Box::new(CommandOcr::from_command_line(command)?))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(year) = args.year {
        config.processor.statement_year = Some(year);
    }
    if args.password.is_some() {
        config.document.password = args.password.clone();
    }

    info!("Input PDF: {}", args.pdf.display());

    let renderer = PdfiumRenderer::new(config.document.render_dpi)?;
    let detector = table_detector(&config)?;
    let engine = ocr_engine(&config)?;

    let mut processor = DocumentProcessor::new(config, renderer, detector, engine);
    if let Some(dir) = &args.visualize {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let visualizer = match &args.font {
            Some(font) => TableVisualizer::with_font(font)?,
            None => TableVisualizer::new(),
        };
        processor = processor.with_visualization(visualizer, dir);
    }

    let document = processor.process(&args.pdf);

    let json = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("result saved to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Some(err) = &document.error {
        bail!("processing {} failed: {}", document.filename, err);
    }
    Ok(())
}
