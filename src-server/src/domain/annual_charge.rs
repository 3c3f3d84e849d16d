//! Annual Charge Entity
//!
//! A recurring yearly cost (rent, insurance...) shown amortized per month.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualCharge {
    pub id: String,
    pub label: String,
    /// Yearly amount, excluding VAT
    pub amount_ht: f64,
    pub year: i32,
    #[serde(default)]
    pub document_url: Option<String>,
}

impl Entity for AnnualCharge {
    type Key = String;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Self::Key {
        self.id.clone()
    }
}
