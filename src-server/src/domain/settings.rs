//! Settings Entity
//!
//! Singleton row (id = 1) holding the rates used by the tax estimates.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

pub const SETTINGS_ID: i64 = 1;
pub const DEFAULT_SOCIAL_CONTRIBUTION_RATE: f64 = 45.0;
pub const DEFAULT_INCOME_TAX_RATE: f64 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Percentage of gross salary
    pub social_contribution_rate: f64,
    /// Percentage of gross salary
    pub income_tax_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            social_contribution_rate: DEFAULT_SOCIAL_CONTRIBUTION_RATE,
            income_tax_rate: DEFAULT_INCOME_TAX_RATE,
        }
    }
}

impl Entity for Settings {
    type Key = i64;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Self::Key {
        SETTINGS_ID
    }
}
