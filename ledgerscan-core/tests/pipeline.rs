use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::NaiveDate;
use glam::Vec2;
use image::DynamicImage;
use ledgerscan_core::{
    DocumentProcessor, LedgerscanError, Pdf, ServiceConfig, TransactionType,
    analysis::bbox::Bbox,
    layout::page::PageImage,
    ocr::{OcrDocument, OcrEngine, OcrLine, OcrWord},
    parse::render::PageRenderer,
    table::{Detection, FullPageDetector, TableDetector, visualize::TableVisualizer},
};
use rust_decimal::Decimal;
use tempfile::TempDir;

struct BlankPages {
    sizes: Vec<(u32, u32)>,
}

impl PageRenderer for BlankPages {
    fn render(&mut self, _pdf: &Pdf) -> Result<Vec<PageImage>, LedgerscanError> {
        Ok(self
            .sizes
            .iter()
            .enumerate()
            .map(|(page_no, (width, height))| {
                PageImage::new(DynamicImage::new_rgb8(*width, *height), page_no)
            })
            .collect())
    }
}

struct BrokenRenderer;

impl PageRenderer for BrokenRenderer {
    fn render(&mut self, pdf: &Pdf) -> Result<Vec<PageImage>, LedgerscanError> {
        Err(LedgerscanError::Io {
            source: std::io::Error::other("truncated xref table"),
            stage: "render".to_string(),
            path: pdf.path.to_string_lossy().to_string(),
        })
    }
}

/// Splits every page into a top and a bottom table.
struct HalfPages;

impl TableDetector for HalfPages {
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
        let size = page.image_size();
        let middle = size.y / 2.0;
        Ok(vec![
            Detection::new(Bbox::new(Vec2::ZERO, Vec2::new(size.x, middle)), 0.9),
            Detection::new(Bbox::new(Vec2::new(0.0, middle), size), 0.8),
        ])
    }
}

/// Answers each region with the next scripted document.
struct ScriptedOcr {
    documents: VecDeque<OcrDocument>,
}

impl ScriptedOcr {
    fn new(tables: Vec<Vec<OcrLine>>) -> Self {
        Self {
            documents: tables.into_iter().map(OcrDocument::from_lines).collect(),
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&mut self, image_path: &Path) -> Result<OcrDocument, LedgerscanError> {
        assert!(image_path.exists());
        Ok(self.documents.pop_front().unwrap_or_default())
    }
}

/// Reads the first region, then fails like a crashed OCR program.
struct FailsOnSecondRegion {
    first: Option<OcrDocument>,
}

impl OcrEngine for FailsOnSecondRegion {
    fn recognize(&mut self, _image_path: &Path) -> Result<OcrDocument, LedgerscanError> {
        match self.first.take() {
            Some(document) => Ok(document),
            None => Err(LedgerscanError::OcrCommand {
                program: "doctr-json".to_string(),
                status: "exit status: 139".to_string(),
                stderr: "segmentation fault".to_string(),
            }),
        }
    }
}

/// Whole-page tables, except that the second page cannot be analysed.
struct FailsOnSecondPage;

impl TableDetector for FailsOnSecondPage {
    fn detect(&mut self, page: &PageImage) -> Result<Vec<Detection>, LedgerscanError> {
        if page.page_no == 1 {
            return Err(LedgerscanError::NotFoundOutput {
                output_name: "output0".to_string(),
            });
        }
        FullPageDetector.detect(page)
    }
}

/// One OCR line at relative height `y`, tokens given with their relative
/// horizontal extent.
fn ocr_line(y: f32, tokens: &[(&str, f32, f32)]) -> OcrLine {
    OcrLine {
        words: tokens
            .iter()
            .map(|(value, x0, x1)| OcrWord {
                value: value.to_string(),
                confidence: 0.9,
                geometry: [[*x0, y], [*x1, y + 0.03]],
            })
            .collect(),
    }
}

fn workspace() -> Result<(TempDir, ServiceConfig, PathBuf), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = ServiceConfig::default();
    config.ocr.temp_dir = dir.path().join("temp");
    config.document.output_dir = dir.path().join("output");
    config.processor.statement_year = Some(2024);

    let pdf = dir.path().join("releve-juin.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n")?;

    Ok((dir, config, pdf))
}

fn amount(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

#[test]
fn test_statement_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, config, pdf) = workspace()?;
    let temp_dir = config.ocr.temp_dir.clone();

    let ocr = ScriptedOcr::new(vec![
        vec![
            ocr_line(
                0.10,
                &[
                    ("15.06", 0.05, 0.10),
                    ("VIREMENT", 0.20, 0.30),
                    ("RECU", 0.33, 0.38),
                    ("SALAIRE", 0.41, 0.50),
                    ("2500,00", 0.80, 0.90),
                ],
            ),
            ocr_line(
                0.20,
                &[("CARTE", 0.20, 0.30), ("SNCF", 0.33, 0.40), ("-45,00", 0.80, 0.90)],
            ),
        ],
        vec![
            // no date yet in this table
            ocr_line(0.10, &[("LOYER", 0.20, 0.30), ("700,00", 0.80, 0.90)]),
            ocr_line(
                0.20,
                &[
                    ("02.07", 0.05, 0.10),
                    ("DEPOT", 0.20, 0.30),
                    ("ESPECES", 0.33, 0.43),
                    ("100,00", 0.80, 0.90),
                ],
            ),
        ],
    ]);
    let renderer = BlankPages {
        sizes: vec![(1000, 500), (1000, 500)],
    };

    let mut processor = DocumentProcessor::new(config, renderer, FullPageDetector, ocr);
    let document = processor.process(&pdf);

    assert_eq!(document.error, None);
    assert_eq!(document.filename, "releve-juin.pdf");
    assert_eq!(document.page_count, 2);
    assert!(document.processing_time >= 0.0);

    let summary = document
        .transactions
        .iter()
        .map(|t| (t.date, t.description.as_str(), t.amount, t.transaction_type))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        [
            (
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                "VIREMENT RECU SALAIRE",
                amount("2500.00"),
                TransactionType::Credit,
            ),
            (
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                "CARTE SNCF",
                amount("-45.00"),
                TransactionType::Debit,
            ),
            (
                NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
                "DEPOT ESPECES",
                amount("100.00"),
                TransactionType::Credit,
            ),
        ]
    );
    assert_eq!(
        document.transactions[0].raw_text,
        "15.06 VIREMENT RECU SALAIRE 2500,00"
    );
    assert!((document.transactions[0].confidence - 0.9).abs() < 1e-6);

    assert!(!temp_dir.exists());
    Ok(())
}

#[test]
fn test_date_resets_between_tables_of_a_page() -> Result<(), Box<dyn std::error::Error>> {
    let (dir, config, pdf) = workspace()?;

    let ocr = ScriptedOcr::new(vec![
        vec![ocr_line(
            0.10,
            &[
                ("03.05", 0.05, 0.10),
                ("PAIEMENT", 0.20, 0.30),
                ("CB", 0.33, 0.36),
                ("12,50", 0.80, 0.90),
            ],
        )],
        vec![
            ocr_line(0.10, &[("FRAIS", 0.20, 0.30), ("2,00", 0.80, 0.90)]),
            ocr_line(
                0.30,
                &[
                    ("04.05", 0.05, 0.10),
                    ("RETRAIT", 0.20, 0.30),
                    ("DAB", 0.33, 0.38),
                    ("20,00", 0.80, 0.90),
                ],
            ),
        ],
    ]);
    let renderer = BlankPages {
        sizes: vec![(1000, 800)],
    };
    let overlays = dir.path().join("overlays");
    std::fs::create_dir_all(&overlays)?;

    let mut processor = DocumentProcessor::new(config, renderer, HalfPages, ocr)
        .with_visualization(TableVisualizer::new(), &overlays);
    let document = processor.process(&pdf);

    assert!(document.is_success());
    assert_eq!(document.page_count, 1);
    let descriptions = document
        .transactions
        .iter()
        .map(|t| (t.description.as_str(), t.transaction_type))
        .collect::<Vec<_>>();
    assert_eq!(
        descriptions,
        [
            ("PAIEMENT CB", TransactionType::Debit),
            ("RETRAIT DAB", TransactionType::Debit),
        ]
    );
    assert_eq!(document.transactions[1].amount, amount("20.00"));
    assert!(overlays.join("page-1.png").is_file());
    Ok(())
}

#[test]
fn test_render_failure_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, config, pdf) = workspace()?;
    let temp_dir = config.ocr.temp_dir.clone();

    let mut processor =
        DocumentProcessor::new(config, BrokenRenderer, FullPageDetector, ScriptedOcr::new(vec![]));
    let document = processor.process(&pdf);

    assert!(!document.is_success());
    assert_eq!(document.page_count, 0);
    assert!(document.transactions.is_empty());
    assert!(
        document
            .error
            .as_deref()
            .is_some_and(|err| err.contains("truncated xref table"))
    );
    assert!(!temp_dir.exists());
    Ok(())
}

#[test]
fn test_unsupported_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (dir, config, _pdf) = workspace()?;
    let text = dir.path().join("releve.txt");
    std::fs::write(&text, b"15.06 SALAIRE 2500,00")?;
    // a temp dir that predates the call is not ours to remove
    let kept = config.ocr.temp_dir.join("keep.png");
    std::fs::create_dir_all(&config.ocr.temp_dir)?;
    std::fs::write(&kept, b"")?;

    let renderer = BlankPages {
        sizes: vec![(100, 100)],
    };
    let mut processor =
        DocumentProcessor::new(config, renderer, FullPageDetector, ScriptedOcr::new(vec![]));
    let document = processor.process(&text);

    assert_eq!(document.filename, "releve.txt");
    assert_eq!(document.page_count, 0);
    assert!(
        document
            .error
            .as_deref()
            .is_some_and(|err| err.contains("unsupported format"))
    );
    assert!(kept.is_file());
    Ok(())
}

#[test]
fn test_year_comes_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut config, _pdf) = workspace()?;
    config.processor.statement_year = Some(2019);

    let processor = DocumentProcessor::new(
        config,
        BlankPages { sizes: vec![] },
        FullPageDetector,
        ScriptedOcr::new(vec![]),
    );
    assert_eq!(processor.year(), 2019);
    Ok(())
}

fn salary_table() -> Vec<OcrLine> {
    vec![ocr_line(
        0.10,
        &[
            ("15.06", 0.05, 0.10),
            ("SALAIRE", 0.20, 0.30),
            ("2500,00", 0.80, 0.90),
        ],
    )]
}

#[test]
fn test_ocr_failure_discards_earlier_tables() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, config, pdf) = workspace()?;
    let temp_dir = config.ocr.temp_dir.clone();

    let ocr = FailsOnSecondRegion {
        first: Some(OcrDocument::from_lines(salary_table())),
    };
    let renderer = BlankPages {
        sizes: vec![(1000, 800)],
    };
    let mut processor = DocumentProcessor::new(config, renderer, HalfPages, ocr);
    let document = processor.process(&pdf);

    assert!(document.transactions.is_empty());
    assert_eq!(document.page_count, 0);
    assert!(
        document
            .error
            .as_deref()
            .is_some_and(|err| err.contains("segmentation fault"))
    );
    assert!(!temp_dir.exists());
    Ok(())
}

#[test]
fn test_detector_failure_discards_earlier_pages() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, config, pdf) = workspace()?;
    let temp_dir = config.ocr.temp_dir.clone();

    let renderer = BlankPages {
        sizes: vec![(1000, 500), (1000, 500)],
    };
    let ocr = ScriptedOcr::new(vec![salary_table()]);
    let mut processor = DocumentProcessor::new(config, renderer, FailsOnSecondPage, ocr);
    let document = processor.process(&pdf);

    assert!(document.transactions.is_empty());
    assert_eq!(document.page_count, 0);
    assert!(
        document
            .error
            .as_deref()
            .is_some_and(|err| err.contains("output0"))
    );
    assert!(!temp_dir.exists());
    Ok(())
}
