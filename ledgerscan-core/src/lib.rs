pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod inference;
pub mod layout;
pub mod ocr;
pub mod parse;
pub mod table;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use error::LedgerscanError;
pub use parse::{
    processor::DocumentProcessor,
    render::{Pdf, PdfBuilder},
    transaction::{ProcessedDocument, Transaction, TransactionType},
};
