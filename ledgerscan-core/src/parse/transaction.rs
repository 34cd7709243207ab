use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TransactionType {
    #[serde(rename = "DEBIT")]
    Debit,
    #[serde(rename = "CREDIT")]
    Credit,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Debit => "DEBIT",
            TransactionType::Credit => "CREDIT",
            TransactionType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One dated movement read off a statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    /// Negative for money leaving the account.
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The whole line as read by OCR.
    pub raw_text: String,
    /// Mean OCR confidence of the line's words.
    pub confidence: f32,
    /// Filled in by the downstream categorization service.
    #[serde(default)]
    pub category: Option<String>,
}

/// Result of processing one statement PDF.
///
/// Failures are reported through `error` with no transactions, never as an
/// `Err`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub transactions: Vec<Transaction>,
    pub page_count: usize,
    pub filename: String,
    /// Wall time in seconds.
    pub processing_time: f64,
    pub error: Option<String>,
}

impl ProcessedDocument {
    pub fn failed(filename: impl Into<String>, processing_time: f64, error: impl fmt::Display) -> Self {
        Self {
            transactions: Vec::new(),
            page_count: 0,
            filename: filename.into(),
            processing_time,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
