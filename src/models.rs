//! Client Models
//!
//! Data structures matching the backend snapshot (camelCase JSON).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SOCIAL_CONTRIBUTION_RATE: f64 = 45.0;
pub const DEFAULT_INCOME_TAX_RATE: f64 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub default_tjm: f64,
}

/// One calendar date. `tjm == 0` records an explicit day off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDay {
    pub date: String,
    #[serde(default)]
    pub client_id: Option<String>,
    pub tjm: f64,
}

impl WorkDay {
    pub fn billed(date: impl Into<String>, client_id: impl Into<String>, tjm: f64) -> Self {
        Self {
            date: date.into(),
            client_id: Some(client_id.into()),
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

/// Expense category, serialized as its French label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

    pub fn label(&self) -> &str {
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
            .find(|known| known.label() == trimmed)
            .cloned()
            .unwrap_or_else(|| ExpenseCategory::Unrecognized(trimmed.to_string()))
    }
}

impl From<String> for ExpenseCategory {
    fn from(label: String) -> Self {
        ExpenseCategory::from_label(&label)
    }
}

impl From<ExpenseCategory> for String {
    fn from(category: ExpenseCategory) -> Self {
        category.label().to_string()
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
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
    pub fn amount_ttc(&self) -> f64 {
        self.amount_ht + self.tva
    }

    /// YYYY-MM part of the date
    pub fn month(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualCharge {
    pub id: String,
    pub label: String,
    pub amount_ht: f64,
    pub year: i32,
    #[serde(default)]
    pub document_url: Option<String>,
}

/// Rates in percent of gross salary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub social_contribution_rate: f64,
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

/// Whole in-memory state, as delivered by `GET /db/sync`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    pub clients: Vec<Client>,
    /// Keyed by YYYY-MM-DD
    pub work_days: BTreeMap<String, WorkDay>,
    pub expenses: Vec<Expense>,
    pub settings: Settings,
    /// Keyed by YYYY-MM
    pub salaries: BTreeMap<String, f64>,
    pub paid_revenues: BTreeMap<String, f64>,
    pub one_off_revenues: BTreeMap<String, f64>,
    pub annual_charges: Vec<AnnualCharge>,
}

impl Ledger {
    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn expense(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }
}

// ========================
// Partial updates
// ========================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub default_tjm: Option<f64>,
}

impl ClientPatch {
    pub fn apply_to(&self, client: &mut Client) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(default_tjm) = self.default_tjm {
            client.default_tjm = default_tjm;
        }
    }
}

/// `Some(None)` clears an optional field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount_ht: Option<f64>,
    pub tva: Option<f64>,
    pub category: Option<Option<ExpenseCategory>>,
    pub client_name: Option<Option<String>>,
    pub receipt_url: Option<Option<String>>,
}

impl ExpensePatch {
    pub fn apply_to(&self, expense: &mut Expense) {
        if let Some(date) = &self.date {
            expense.date = date.clone();
        }
        if let Some(description) = &self.description {
            expense.description = description.clone();
        }
        if let Some(amount_ht) = self.amount_ht {
            expense.amount_ht = amount_ht;
        }
        if let Some(tva) = self.tva {
            expense.tva = tva;
        }
        if let Some(category) = &self.category {
            expense.category = category.clone();
        }
        if let Some(client_name) = &self.client_name {
            expense.client_name = client_name.clone();
        }
        if let Some(receipt_url) = &self.receipt_url {
            expense.receipt_url = receipt_url.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub social_contribution_rate: Option<f64>,
    pub income_tax_rate: Option<f64>,
}

impl SettingsPatch {
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(rate) = self.social_contribution_rate {
            settings.social_contribution_rate = rate;
        }
        if let Some(rate) = self.income_tax_rate {
            settings.income_tax_rate = rate;
        }
    }
}
