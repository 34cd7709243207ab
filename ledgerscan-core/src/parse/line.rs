use std::{str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::*;

use crate::{
    layout::element::Line,
    parse::transaction::{Transaction, TransactionType},
};

/// `day.month` at the very start of a line.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})").expect("valid date regex"));

/// Turns the clustered lines of one table into transactions.
///
/// Statement lines only carry `day.month`, the year is fixed per parser.
/// The running date is threaded explicitly through [`LineParser::parse_line`]
/// so a table scan is a fold over its lines.
#[derive(Debug, Clone, Copy)]
pub struct LineParser {
    year: i32,
}

impl LineParser {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Transactions of one table, starting with no current date.
    pub fn parse_lines(&self, lines: &[Line]) -> Vec<Transaction> {
        let (_, transactions) = lines.iter().fold(
            (None, Vec::new()),
            |(current, mut transactions), line| {
                let (current, transaction) = self.parse_line(current, line);
                transactions.extend(transaction);
                (current, transactions)
            },
        );
        transactions
    }

    /// One step of the table scan.
    ///
    /// - A line opening with a valid `day.month` starts a new date. With a
    ///   single word it only moves the date; otherwise the last word is the
    ///   amount and the words in between the description.
    /// - Any other line inherits `current`: all words but the last form the
    ///   description.
    /// - A line whose amount does not parse yields nothing and leaves the
    ///   date untouched.
    pub fn parse_line(
        &self,
        current: Option<NaiveDate>,
        line: &Line,
    ) -> (Option<NaiveDate>, Option<Transaction>) {
        let words = &line.words;
        let Some(last) = words.last() else {
            return (current, None);
        };
        let raw_text = line.text();

        let (date, description_words) = match self.line_date(&raw_text) {
            Some(date) if words.len() == 1 => {
                trace!("date marker {}", date);
                return (Some(date), None);
            }
            Some(date) => (date, &words[1..words.len() - 1]),
            None => match current {
                Some(date) => (date, &words[..words.len() - 1]),
                None => return (current, None),
            },
        };

        let Some(amount) = parse_amount(&last.text) else {
            trace!("skip line without amount `{}`", raw_text);
            return (current, None);
        };

        let description = description_words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let transaction = Transaction {
            date,
            description,
            amount,
            transaction_type: TransactionType::Unknown,
            raw_text,
            confidence: line.confidence(),
            category: None,
        };

        (Some(date), Some(transaction))
    }

    /// Calendar date of a leading `day.month`, `None` for `31.02` and the like.
    fn line_date(&self, text: &str) -> Option<NaiveDate> {
        let captures = DATE_PATTERN.captures(text)?;
        let day = captures[1].parse::<u32>().ok()?;
        let month = captures[2].parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(self.year, month, day)
    }
}

/// Reads a statement amount: comma decimal separator, spaces ignored.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let normalized = text.replace(',', ".").replace(' ', "");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}
