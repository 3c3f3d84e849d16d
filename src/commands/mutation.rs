//! Mutation Wire Format
//!
//! Rows are built from the typed models so payload keys always match the
//! remote column names.

use serde::ser::Serializer;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::models::{AnnualCharge, Client, Expense, Settings, WorkDay};

pub type Fields = Map<String, Value>;

const SETTINGS_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Clients,
    WorkDays,
    Expenses,
    Settings,
    Salaries,
    PaidRevenues,
    OneOffRevenues,
    AnnualCharges,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::WorkDays => "work_days",
            Table::Expenses => "expenses",
            Table::Settings => "settings",
            Table::Salaries => "salaries",
            Table::PaidRevenues => "paid_revenues",
            Table::OneOffRevenues => "one_off_revenues",
            Table::AnnualCharges => "annual_charges",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Upsert { table: Table, row: Fields },
    Delete { table: Table, filter: Fields },
}

#[derive(Serialize)]
struct WireMutation<'a> {
    table: &'static str,
    action: &'static str,
    payload: &'a Fields,
}

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

impl Mutation {
    pub fn table(&self) -> Table {
        match self {
            Mutation::Upsert { table, .. } | Mutation::Delete { table, .. } => *table,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Mutation::Upsert { .. } => "upsert",
            Mutation::Delete { .. } => "delete",
        }
    }

    pub fn payload(&self) -> &Fields {
        match self {
            Mutation::Upsert { row, .. } => row,
            Mutation::Delete { filter, .. } => filter,
        }
    }

    fn upsert(table: Table, row: Value) -> Self {
        Mutation::Upsert { table, row: fields(row) }
    }

    fn delete(table: Table, filter: Value) -> Self {
        Mutation::Delete { table, filter: fields(filter) }
    }

    // ========================
    // Row builders
    // ========================

    pub fn upsert_client(client: &Client) -> Self {
        Self::upsert(
            Table::Clients,
            json!({ "id": client.id, "name": client.name, "default_tjm": client.default_tjm }),
        )
    }

    pub fn delete_client(id: &str) -> Self {
        Self::delete(Table::Clients, json!({ "id": id }))
    }

    pub fn upsert_work_day(work_day: &WorkDay) -> Self {
        Self::upsert(
            Table::WorkDays,
            json!({ "date": work_day.date, "client_id": work_day.client_id, "tjm": work_day.tjm }),
        )
    }

    pub fn delete_work_day(date: &str) -> Self {
        Self::delete(Table::WorkDays, json!({ "date": date }))
    }

    pub fn upsert_expense(expense: &Expense) -> Self {
        Self::upsert(
            Table::Expenses,
            json!({
                "id": expense.id,
                "date": expense.date,
                "description": expense.description,
                "amount_ht": expense.amount_ht,
                "tva": expense.tva,
                "category": expense.category.as_ref().map(|c| c.label()),
                "client_name": expense.client_name,
                "receipt_url": expense.receipt_url,
            }),
        )
    }

    pub fn delete_expense(id: &str) -> Self {
        Self::delete(Table::Expenses, json!({ "id": id }))
    }

    pub fn upsert_settings(settings: &Settings) -> Self {
        Self::upsert(
            Table::Settings,
            json!({
                "id": SETTINGS_ID,
                "social_contribution_rate": settings.social_contribution_rate,
                "income_tax_rate": settings.income_tax_rate,
            }),
        )
    }

    /// Salaries, paid revenues and one-off revenues share the same shape
    pub fn upsert_monthly(table: Table, month: &str, amount: f64) -> Self {
        Self::upsert(table, json!({ "month_str": month, "amount": amount }))
    }

    pub fn upsert_annual_charge(charge: &AnnualCharge) -> Self {
        Self::upsert(
            Table::AnnualCharges,
            json!({
                "id": charge.id,
                "label": charge.label,
                "amount_ht": charge.amount_ht,
                "year": charge.year,
                "document_url": charge.document_url,
            }),
        )
    }

    pub fn delete_annual_charge(id: &str) -> Self {
        Self::delete(Table::AnnualCharges, json!({ "id": id }))
    }
}

/// `{table, action, payload}`
impl Serialize for Mutation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireMutation {
            table: self.table().name(),
            action: self.action(),
            payload: self.payload(),
        }
        .serialize(serializer)
    }
}
