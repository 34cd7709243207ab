use std::collections::BTreeMap;

use crate::parse::transaction::{Transaction, TransactionType};

/// Keywords per transaction type, checked in `DEBIT`, `CREDIT` order.
pub type TransactionKeywords = BTreeMap<TransactionType, Vec<String>>;

pub fn default_transaction_types() -> TransactionKeywords {
    let keywords = |words: &[&str]| -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    };
    BTreeMap::from([
        (
            TransactionType::Debit,
            keywords(&["RETRAIT", "PAIEMENT", "VIREMENT EMIS"]),
        ),
        (TransactionType::Credit, keywords(&["DEPOT", "VIREMENT RECU"])),
    ])
}

/// Sets the debit/credit type of validated transactions.
#[derive(Debug, Clone)]
pub struct TransactionCategorizer {
    transaction_types: TransactionKeywords,
}

impl Default for TransactionCategorizer {
    fn default() -> Self {
        Self::new(default_transaction_types())
    }
}

impl TransactionCategorizer {
    pub fn new(transaction_types: TransactionKeywords) -> Self {
        Self { transaction_types }
    }

    pub fn categorize_transactions(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions
            .into_iter()
            .map(|transaction| Transaction {
                transaction_type: self.determine_type(&transaction),
                ..transaction
            })
            .collect()
    }

    /// First type with a keyword contained in the upper-cased description,
    /// otherwise the sign of the amount decides.
    pub fn determine_type(&self, transaction: &Transaction) -> TransactionType {
        let description = transaction.description.to_uppercase();

        self.transaction_types
            .iter()
            .find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|keyword| description.contains(keyword.as_str()))
            })
            .map(|(transaction_type, _)| *transaction_type)
            .unwrap_or(if transaction.amount.is_sign_negative() {
                TransactionType::Debit
            } else {
                TransactionType::Credit
            })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn transaction(description: &str, amount: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            transaction_type: TransactionType::Unknown,
            raw_text: String::new(),
            confidence: 1.0,
            category: None,
        }
    }

    #[test]
    fn test_keywords_win_over_sign() {
        let categorizer = TransactionCategorizer::default();

        let types = categorizer
            .categorize_transactions(vec![
                transaction("Virement recu salaire", "2500.00"),
                transaction("RETRAIT DAB", "60.00"),
                transaction("CARTE SNCF", "-45.0"),
                transaction("REMISE CHEQUE", "120.00"),
            ])
            .into_iter()
            .map(|t| t.transaction_type)
            .collect::<Vec<_>>();

        assert_eq!(
            types,
            [
                TransactionType::Credit,
                TransactionType::Debit,
                TransactionType::Debit,
                TransactionType::Credit,
            ]
        );
    }

    #[test]
    fn test_category_left_for_downstream() {
        let categorized =
            TransactionCategorizer::default().categorize_transactions(vec![transaction("DEPOT", "10")]);
        assert_eq!(categorized[0].category, None);
    }
}
