//! Ledger rows and their natural keys
//!
//! No ledger table carries a surrogate row id. Clients, expenses and annual
//! charges keep the id chosen by the client application; a work day is keyed
//! by its calendar date, a monthly amount by its `YYYY-MM` month, and the
//! settings row is the singleton with id 1. Upserts conflict on exactly these
//! columns, so the key column of an entity must be the primary key of its
//! table in the mutation allow-list.

use serde::{Deserialize, Serialize};

/// A row of one of the ledger tables
pub trait Entity: Sized + Send + Sync + Clone {
    /// Natural key; ordered so keyed snapshot maps come out sorted
    type Key: Clone + Ord + Send + Sync;

    /// Column holding the key in storage
    const KEY_COLUMN: &'static str;

    fn key(&self) -> Self::Key;
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised below the HTTP layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainError {
    /// No row or receipt under that key
    NotFound(String),
    /// Rejected by the allow-list or a value check; never reaches storage
    InvalidInput(String),
    /// A receipt path that is already taken
    Conflict(String),
    /// SQLite or filesystem failure
    Internal(String),
}

impl DomainError {
    /// True when the caller sent something the ledger refuses
    pub fn is_rejection(&self) -> bool {
        matches!(self, DomainError::InvalidInput(_) | DomainError::NotFound(_))
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AnnualCharge, Client, Expense, MonthlyAmount, Settings, Table, WorkDay, SETTINGS_ID,
    };

    fn key_column_of<T: Entity>() -> &'static str {
        T::KEY_COLUMN
    }

    #[test]
    fn test_key_columns_match_table_primary_keys() {
        assert_eq!(key_column_of::<Client>(), Table::Clients.primary_key());
        assert_eq!(key_column_of::<WorkDay>(), Table::WorkDays.primary_key());
        assert_eq!(key_column_of::<Expense>(), Table::Expenses.primary_key());
        assert_eq!(key_column_of::<Settings>(), Table::Settings.primary_key());
        assert_eq!(key_column_of::<AnnualCharge>(), Table::AnnualCharges.primary_key());
        for table in [Table::Salaries, Table::PaidRevenues, Table::OneOffRevenues] {
            assert_eq!(key_column_of::<MonthlyAmount>(), table.primary_key());
        }
    }

    #[test]
    fn test_natural_keys() {
        let day = WorkDay {
            date: "2025-03-03".to_string(),
            client_id: Some("TF1".to_string()),
            tjm: 650.0,
        };
        assert_eq!(day.key(), "2025-03-03");
        assert_eq!(Settings::default().key(), SETTINGS_ID);

        let salary = MonthlyAmount {
            month_str: "2025-03".to_string(),
            amount: 3000.0,
        };
        assert_eq!(salary.key(), "2025-03");
    }

    #[test]
    fn test_rejections_are_caller_errors() {
        assert!(DomainError::InvalidInput("x".into()).is_rejection());
        assert!(DomainError::NotFound("x".into()).is_rejection());
        assert!(!DomainError::Internal("x".into()).is_rejection());
    }
}
