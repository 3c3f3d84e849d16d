//! Client Entity
//!
//! A customer billed by the day.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Default day rate (TJM) proposed when booking a day for this client
    pub default_tjm: f64,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>, default_tjm: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_tjm,
        }
    }
}

impl Entity for Client {
    type Key = String;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Self::Key {
        self.id.clone()
    }
}
