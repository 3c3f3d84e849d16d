//! Expense Entity
//!
//! A business expense with optional receipt. The category is a closed set of
//! labels; anything else is kept as `Unrecognized` instead of passing through
//! silently.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// Expense category. Serialized as its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpenseCategory {
    Restaurant,
    Transport,
    Lodging,
    Software,
    Equipment,
    Telecom,
    BankFees,
    Other,
    /// A label outside the known set, kept verbatim
    Unrecognized(String),
}

impl ExpenseCategory {
    pub const KNOWN: [ExpenseCategory; 8] = [
        ExpenseCategory::Restaurant,
        ExpenseCategory::Transport,
        ExpenseCategory::Lodging,
        ExpenseCategory::Software,
        ExpenseCategory::Equipment,
        ExpenseCategory::Telecom,
        ExpenseCategory::BankFees,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ExpenseCategory::Restaurant => "Restaurant / Repas",
            ExpenseCategory::Transport => "Transport (Train, Avion, Taxi)",
            ExpenseCategory::Lodging => "Hébergement (Hôtel)",
            ExpenseCategory::Software => "Logiciels & Licences",
            ExpenseCategory::Equipment => "Matériel & Fournitures",
            ExpenseCategory::Telecom => "Téléphone & Internet",
            ExpenseCategory::BankFees => "Frais Bancaires",
            ExpenseCategory::Other => "Autre",
            ExpenseCategory::Unrecognized(raw) => raw,
        }
    }

    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == trimmed)
            .cloned()
            .unwrap_or_else(|| ExpenseCategory::Unrecognized(trimmed.to_string()))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ExpenseCategory::Unrecognized(_))
    }

    /// Collapse unknown labels into `Other`
    pub fn or_other(self) -> Self {
        match self {
            ExpenseCategory::Unrecognized(_) => ExpenseCategory::Other,
            known => known,
        }
    }
}

impl From<String> for ExpenseCategory {
    fn from(label: String) -> Self {
        ExpenseCategory::from_label(&label)
    }
}

impl From<ExpenseCategory> for String {
    fn from(category: ExpenseCategory) -> Self {
        category.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    /// YYYY-MM-DD
    pub date: String,
    pub description: String,
    pub amount_ht: f64,
    pub tva: f64,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

impl Expense {
    /// Tax-inclusive amount
    pub fn amount_ttc(&self) -> f64 {
        self.amount_ht + self.tva
    }
}

impl Entity for Expense {
    type Key = String;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Self::Key {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_parse() {
        for category in ExpenseCategory::KNOWN {
            assert_eq!(ExpenseCategory::from_label(category.as_str()), category);
        }
        assert_eq!(
            ExpenseCategory::from_label("  Frais Bancaires "),
            ExpenseCategory::BankFees
        );
    }

    #[test]
    fn test_unknown_label_is_explicit() {
        let category = ExpenseCategory::from_label("Cadeaux");
        assert_eq!(category, ExpenseCategory::Unrecognized("Cadeaux".to_string()));
        assert!(!category.is_recognized());
        assert_eq!(category.or_other(), ExpenseCategory::Other);
    }

    #[test]
    fn test_expense_json_shape() {
        let json = serde_json::json!({
            "id": "e1",
            "date": "2025-03-10",
            "description": "Train Paris-Lyon",
            "amountHt": 80.0,
            "tva": 8.0,
            "category": "Transport (Train, Avion, Taxi)",
            "clientName": null
        });
        let expense: Expense = serde_json::from_value(json).unwrap();
        assert_eq!(expense.category, Some(ExpenseCategory::Transport));
        assert_eq!(expense.amount_ttc(), 88.0);
        assert!(expense.receipt_url.is_none());
    }
}
