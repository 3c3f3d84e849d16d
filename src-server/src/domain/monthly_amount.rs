//! Monthly amounts
//!
//! Salaries, collected revenue and one-off revenue all share the same shape:
//! one amount per YYYY-MM month.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAmount {
    pub month_str: String,
    pub amount: f64,
}

impl MonthlyAmount {
    pub fn new(month_str: impl Into<String>, amount: f64) -> Self {
        Self {
            month_str: month_str.into(),
            amount,
        }
    }
}

impl Entity for MonthlyAmount {
    type Key = String;
    const KEY_COLUMN: &'static str = "month_str";

    fn key(&self) -> Self::Key {
        self.month_str.clone()
    }
}
