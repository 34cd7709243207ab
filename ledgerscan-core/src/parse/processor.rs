use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::{Datelike, Local};
use tracing::*;

use crate::{
    config::ServiceConfig,
    error::LedgerscanError,
    layout::page::PageImage,
    ocr::{OcrEngine, OcrExtractor},
    parse::{
        categorizer::TransactionCategorizer,
        line::LineParser,
        render::{PageRenderer, Pdf, PdfBuilder},
        transaction::{ProcessedDocument, Transaction},
        validator::TransactionValidator,
    },
    table::{TableDetector, TableExtractor, visualize::TableVisualizer},
};

/// Runs the whole extraction over every page of a statement.
///
/// Pages are handled in physical order, tables in detection order and lines
/// top to bottom, all on the calling thread.
pub struct DocumentProcessor<R: PageRenderer, D: TableDetector, E: OcrEngine> {
    config: ServiceConfig,
    renderer: R,
    tables: TableExtractor<D>,
    ocr: OcrExtractor<E>,
    parser: LineParser,
    validator: TransactionValidator,
    categorizer: TransactionCategorizer,
    visualize: Option<(TableVisualizer, PathBuf)>,
}

impl<R: PageRenderer, D: TableDetector, E: OcrEngine> DocumentProcessor<R, D, E> {
    pub fn new(config: ServiceConfig, renderer: R, detector: D, engine: E) -> Self {
        let year = config
            .processor
            .statement_year
            .unwrap_or_else(|| Local::now().year());

        Self {
            renderer,
            tables: TableExtractor::new(detector),
            ocr: OcrExtractor::new(engine, config.ocr.extractor_config()),
            parser: LineParser::new(year),
            validator: TransactionValidator::new(config.validation.clone()),
            categorizer: TransactionCategorizer::new(config.processor.transaction_types.clone()),
            visualize: None,
            config,
        }
    }

    /// Writes a `page-N.png` overlay of the detected tables into `dir`.
    pub fn with_visualization(mut self, visualizer: TableVisualizer, dir: impl Into<PathBuf>) -> Self {
        self.visualize = Some((visualizer, dir.into()));
        self
    }

    pub fn year(&self) -> i32 {
        self.parser.year()
    }

    /// Processes every page of the PDF at `path`, opened with the configured
    /// password.
    pub fn process<P: AsRef<Path>>(&mut self, path: P) -> ProcessedDocument {
        let path = path.as_ref();
        match PdfBuilder::default()
            .path(path)
            .password(self.config.document.password.clone())
            .build()
        {
            Ok(pdf) => self.process_pdf(&pdf),
            Err(err) => ProcessedDocument::failed(path.to_string_lossy(), 0.0, err),
        }
    }

    /// Never fails: any error aborts the document and is reported in
    /// [`ProcessedDocument::error`].
    ///
    /// A rejected input returns before the working directories are touched.
    #[tracing::instrument(skip_all, fields(filename = %pdf.filename()))]
    pub fn process_pdf(&mut self, pdf: &Pdf) -> ProcessedDocument {
        let start = Instant::now();
        let filename = pdf.filename();

        if let Err(err) = self.config.validate_file(&pdf.path) {
            warn!("rejected input: {}", err);
            return ProcessedDocument::failed(filename, start.elapsed().as_secs_f64(), err);
        }

        let result = self.extract(pdf);
        self.config.cleanup();
        let processing_time = start.elapsed().as_secs_f64();

        match result {
            Ok((page_count, transactions)) => {
                info!(
                    "extracted {} transactions from {} pages in {:.2}s",
                    transactions.len(),
                    page_count,
                    processing_time
                );
                ProcessedDocument {
                    transactions,
                    page_count,
                    filename,
                    processing_time,
                    error: None,
                }
            }
            Err(err) => {
                error!("processing failed: {}", err);
                ProcessedDocument::failed(filename, processing_time, err)
            }
        }
    }

    fn extract(&mut self, pdf: &Pdf) -> Result<(usize, Vec<Transaction>), LedgerscanError> {
        self.config.create_directories()?;

        let pages = self.renderer.render(pdf)?;

        let mut transactions = Vec::new();
        for page in &pages {
            transactions.extend(self.process_page(page)?);
        }

        let transactions = self.validator.validate_transactions(transactions);
        let transactions = self.categorizer.categorize_transactions(transactions);

        Ok((pages.len(), transactions))
    }

    /// Transactions of one page. The running date restarts with every table.
    #[tracing::instrument(skip_all, fields(page = page.page_no))]
    pub fn process_page(&mut self, page: &PageImage) -> Result<Vec<Transaction>, LedgerscanError> {
        let tables = self.tables.extract_tables(page)?;

        if let Some((visualizer, dir)) = &self.visualize {
            let boxes = tables.iter().map(|table| table.coordinates).collect::<Vec<_>>();
            visualizer.save(
                &page.image,
                &boxes,
                dir.join(format!("page-{}.png", page.page_no + 1)),
            )?;
        }

        let mut transactions = Vec::new();
        for table in &tables {
            let lines = self
                .ocr
                .extract_text_from_region(table.image, &table.coordinates)?;
            let table_transactions = self.parser.parse_lines(&lines);
            debug!(
                "table {:?}: {} lines, {} transactions",
                table.coordinates.to_list(),
                lines.len(),
                table_transactions.len()
            );
            transactions.extend(table_transactions);
        }

        Ok(transactions)
    }
}
