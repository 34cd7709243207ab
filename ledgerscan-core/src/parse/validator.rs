use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::parse::transaction::Transaction;

/// Transaction field that must carry a value for the transaction to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Date,
    Description,
    Amount,
    /// Always has a value, `unknown` included.
    Type,
    RawText,
    Category,
}

impl RequiredField {
    pub fn is_present(&self, transaction: &Transaction) -> bool {
        match self {
            RequiredField::Date | RequiredField::Type => true,
            RequiredField::Description => !transaction.description.trim().is_empty(),
            RequiredField::Amount => !transaction.amount.is_zero(),
            RequiredField::RawText => !transaction.raw_text.trim().is_empty(),
            RequiredField::Category => transaction
                .category
                .as_deref()
                .is_some_and(|category| !category.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Smallest absolute amount kept.
    pub min_transaction_amount: Decimal,
    pub required_fields: Vec<RequiredField>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_transaction_amount: Decimal::ZERO,
            required_fields: vec![
                RequiredField::Date,
                RequiredField::Description,
                RequiredField::Amount,
            ],
        }
    }
}

/// Drops transactions that cannot be real movements. Rejections are not
/// reported individually.
#[derive(Debug, Clone, Default)]
pub struct TransactionValidator {
    config: ValidationConfig,
}

impl TransactionValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate_transactions(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        let total = transactions.len();
        let valid = transactions
            .into_iter()
            .filter(|transaction| self.is_valid(transaction))
            .collect::<Vec<_>>();

        if valid.len() < total {
            debug!("validation dropped {} of {} transactions", total - valid.len(), total);
        }
        valid
    }

    /// Non-zero amount, non-blank description, amount at least the minimum
    /// and every required field present.
    pub fn is_valid(&self, transaction: &Transaction) -> bool {
        !transaction.amount.is_zero()
            && !transaction.description.trim().is_empty()
            && transaction.amount.abs() >= self.config.min_transaction_amount
            && self
                .config
                .required_fields
                .iter()
                .all(|field| field.is_present(transaction))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::*;
    use crate::parse::transaction::TransactionType;

    fn transaction(description: &str, amount: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            transaction_type: TransactionType::Unknown,
            raw_text: format!("10.01 {description} {amount}"),
            confidence: 0.9,
            category: None,
        }
    }

    #[test]
    fn test_zero_and_empty_rejected() {
        let validator = TransactionValidator::default();
        let valid = validator.validate_transactions(vec![
            transaction("RETRAIT", "-60.00"),
            transaction("FRAIS", "0.00"),
            transaction("  ", "12.00"),
        ]);

        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].description, "RETRAIT");
    }

    #[test]
    fn test_min_amount_is_absolute() {
        let validator = TransactionValidator::new(ValidationConfig {
            min_transaction_amount: Decimal::from(5),
            ..Default::default()
        });

        assert!(validator.is_valid(&transaction("RETRAIT", "-60.00")));
        assert!(validator.is_valid(&transaction("VIREMENT", "5")));
        assert!(!validator.is_valid(&transaction("FRAIS", "-2.50")));
    }

    #[test]
    fn test_required_category() {
        let validator = TransactionValidator::new(ValidationConfig {
            required_fields: vec![RequiredField::Category],
            ..Default::default()
        });
        let mut tagged = transaction("CARTE", "-12.00");
        assert!(!validator.is_valid(&tagged));

        tagged.category = Some("TRANSPORT".to_string());
        assert!(validator.is_valid(&tagged));
    }

    #[test]
    fn test_required_fields_yaml() -> Result<(), serde_yaml::Error> {
        let config: ValidationConfig =
            serde_yaml::from_str("required_fields: [date, raw_text, type]")?;
        assert_eq!(
            config.required_fields,
            [RequiredField::Date, RequiredField::RawText, RequiredField::Type]
        );
        assert_eq!(config.min_transaction_amount, Decimal::ZERO);
        Ok(())
    }
}
