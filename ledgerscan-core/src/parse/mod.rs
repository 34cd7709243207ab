pub mod categorizer;
pub mod line;
pub mod processor;
pub mod render;
pub mod transaction;
pub mod validator;

pub use processor::DocumentProcessor;
pub use render::{PageRenderer, Pdf, PdfBuilder, PdfiumRenderer};
pub use transaction::{ProcessedDocument, Transaction, TransactionType};
