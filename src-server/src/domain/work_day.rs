//! WorkDay Entity
//!
//! One entry per calendar date. A day rate of 0 marks the day as explicitly
//! not worked, which differs from having no entry at all.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDay {
    /// YYYY-MM-DD
    pub date: String,
    #[serde(default)]
    pub client_id: Option<String>,
    pub tjm: f64,
}

impl WorkDay {
    pub fn billed(date: impl Into<String>, client_id: Option<String>, tjm: f64) -> Self {
        Self {
            date: date.into(),
            client_id,
            tjm,
        }
    }

    pub fn not_worked(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            client_id: None,
            tjm: 0.0,
        }
    }

    pub fn is_billed(&self) -> bool {
        self.tjm > 0.0
    }
}

impl Entity for WorkDay {
    type Key = String;
    const KEY_COLUMN: &'static str = "date";

    fn key(&self) -> Self::Key {
        self.date.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_worked_is_not_billed() {
        let day = WorkDay::not_worked("2025-03-04");
        assert!(!day.is_billed());
        assert_eq!(day.key(), "2025-03-04");

        let billed = WorkDay::billed("2025-03-03", Some("TF1".to_string()), 650.0);
        assert!(billed.is_billed());
    }
}
