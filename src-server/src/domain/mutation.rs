//! Mutation Commands
//!
//! The generic `/db/mutate` payload is parsed into a tagged command checked
//! against a fixed allow-list of tables and columns. Table and column names
//! in a validated command are always `'static` names from this module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::{DomainError, DomainResult};
use super::expense::ExpenseCategory;
use super::settings::SETTINGS_ID;

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

/// How a column value is checked before it reaches storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// YYYY-MM-DD
    Date,
    /// YYYY-MM
    Month,
    /// Expense category label
    Category,
    /// Non-negative decimal
    Amount,
    Real,
    Integer,
    /// Calendar year, 1..=9999
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

const fn col(name: &'static str, kind: ColumnKind, nullable: bool) -> Column {
    Column { name, kind, nullable }
}

const CLIENT_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text, false),
    col("name", ColumnKind::Text, false),
    col("default_tjm", ColumnKind::Amount, false),
];

const WORK_DAY_COLUMNS: &[Column] = &[
    col("date", ColumnKind::Date, false),
    col("client_id", ColumnKind::Text, true),
    col("tjm", ColumnKind::Amount, false),
];

const EXPENSE_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text, false),
    col("date", ColumnKind::Date, false),
    col("description", ColumnKind::Text, false),
    col("amount_ht", ColumnKind::Amount, false),
    col("tva", ColumnKind::Amount, false),
    col("category", ColumnKind::Category, true),
    col("client_name", ColumnKind::Text, true),
    col("receipt_url", ColumnKind::Text, true),
];

const SETTINGS_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Integer, false),
    col("social_contribution_rate", ColumnKind::Amount, false),
    col("income_tax_rate", ColumnKind::Amount, false),
];

const MONTHLY_COLUMNS: &[Column] = &[
    col("month_str", ColumnKind::Month, false),
    col("amount", ColumnKind::Real, false),
];

const ANNUAL_CHARGE_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text, false),
    col("label", ColumnKind::Text, false),
    col("amount_ht", ColumnKind::Amount, false),
    col("year", ColumnKind::Year, false),
    col("document_url", ColumnKind::Text, true),
];

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Clients,
        Table::WorkDays,
        Table::Expenses,
        Table::Settings,
        Table::Salaries,
        Table::PaidRevenues,
        Table::OneOffRevenues,
        Table::AnnualCharges,
    ];

    pub fn name(&self) -> &'static str {
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

    pub fn from_name(name: &str) -> Option<Table> {
        Self::ALL.iter().copied().find(|table| table.name() == name)
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::WorkDays => "date",
            Table::Salaries | Table::PaidRevenues | Table::OneOffRevenues => "month_str",
            _ => "id",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Clients => CLIENT_COLUMNS,
            Table::WorkDays => WORK_DAY_COLUMNS,
            Table::Expenses => EXPENSE_COLUMNS,
            Table::Settings => SETTINGS_COLUMNS,
            Table::Salaries | Table::PaidRevenues | Table::OneOffRevenues => MONTHLY_COLUMNS,
            Table::AnnualCharges => ANNUAL_CHARGE_COLUMNS,
        }
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|column| column.name == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A checked column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Real(f64),
    Integer(i64),
}

/// Column/value pairs, in the table's column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Upsert,
    Delete,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Upsert => "upsert",
            MutationAction::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upsert" => Some(MutationAction::Upsert),
            "delete" => Some(MutationAction::Delete),
            _ => None,
        }
    }
}

/// Wire form of `POST /db/mutate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    pub table: String,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// A validated mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationCommand {
    /// Insert, or update the supplied columns of the row with the same primary key
    Upsert { table: Table, row: Row },
    /// Remove every row matching all fields of the filter
    Delete { table: Table, filter: Row },
}

impl MutationCommand {
    pub fn table(&self) -> Table {
        match self {
            MutationCommand::Upsert { table, .. } | MutationCommand::Delete { table, .. } => *table,
        }
    }

    pub fn action(&self) -> MutationAction {
        match self {
            MutationCommand::Upsert { .. } => MutationAction::Upsert,
            MutationCommand::Delete { .. } => MutationAction::Delete,
        }
    }

    pub fn from_request(request: &MutationRequest) -> DomainResult<Self> {
        let table = Table::from_name(&request.table).ok_or_else(|| {
            DomainError::InvalidInput(format!("unknown table '{}'", request.table))
        })?;
        let action = MutationAction::from_name(&request.action).ok_or_else(|| {
            DomainError::InvalidInput(format!("unknown action '{}'", request.action))
        })?;
        let payload = request.payload.as_object().ok_or_else(|| {
            DomainError::InvalidInput("payload must be a JSON object".to_string())
        })?;

        let row = parse_row(table, payload)?;

        match action {
            MutationAction::Upsert => {
                let key = table.primary_key();
                match row.get(key) {
                    Some(FieldValue::Null) | None => {
                        return Err(DomainError::InvalidInput(format!(
                            "upsert on {} requires '{}'",
                            table, key
                        )))
                    }
                    Some(_) => {}
                }
                Ok(MutationCommand::Upsert { table, row })
            }
            MutationAction::Delete => {
                if row.is_empty() {
                    return Err(DomainError::InvalidInput(format!(
                        "delete on {} requires at least one filter field",
                        table
                    )));
                }
                Ok(MutationCommand::Delete { table, filter: row })
            }
        }
    }
}

fn parse_row(table: Table, payload: &Map<String, Value>) -> DomainResult<Row> {
    for key in payload.keys() {
        if table.column(key).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "unknown column '{}' for table {}",
                key, table
            )));
        }
    }

    let mut fields = Vec::with_capacity(payload.len());
    for column in table.columns() {
        if let Some(raw) = payload.get(column.name) {
            fields.push((column.name, check_value(table, column, raw)?));
        }
    }

    if table == Table::Settings {
        if let Some(id) = fields.iter().find(|(name, _)| *name == "id").map(|(_, v)| v) {
            if *id != FieldValue::Integer(SETTINGS_ID) {
                return Err(DomainError::InvalidInput(format!(
                    "settings id must be {}",
                    SETTINGS_ID
                )));
            }
        }
    }

    Ok(Row { fields })
}

fn check_value(table: Table, column: &Column, raw: &Value) -> DomainResult<FieldValue> {
    let invalid = |what: &str| {
        DomainError::InvalidInput(format!("{}.{}: {}", table, column.name, what))
    };

    if raw.is_null() {
        return if column.nullable {
            Ok(FieldValue::Null)
        } else {
            Err(invalid("must not be null"))
        };
    }

    match column.kind {
        ColumnKind::Text => raw
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(|| invalid("expected a string")),
        ColumnKind::Date => {
            let s = raw.as_str().ok_or_else(|| invalid("expected a date string"))?;
            if !is_date_key(s) {
                return Err(invalid("expected YYYY-MM-DD"));
            }
            Ok(FieldValue::Text(s.to_string()))
        }
        ColumnKind::Month => {
            let s = raw.as_str().ok_or_else(|| invalid("expected a month string"))?;
            if !is_month_key(s) {
                return Err(invalid("expected YYYY-MM"));
            }
            Ok(FieldValue::Text(s.to_string()))
        }
        ColumnKind::Category => {
            let s = raw.as_str().ok_or_else(|| invalid("expected a category label"))?;
            let category = ExpenseCategory::from_label(s);
            if !category.is_recognized() {
                log::warn!("Unrecognized expense category '{}' stored as-is", s);
            }
            Ok(FieldValue::Text(category.as_str().to_string()))
        }
        ColumnKind::Amount => {
            let n = finite_number(raw).ok_or_else(|| invalid("expected a number"))?;
            if n < 0.0 {
                return Err(invalid("must not be negative"));
            }
            Ok(FieldValue::Real(n))
        }
        ColumnKind::Real => finite_number(raw)
            .map(FieldValue::Real)
            .ok_or_else(|| invalid("expected a number")),
        ColumnKind::Integer => integer(raw)
            .map(FieldValue::Integer)
            .ok_or_else(|| invalid("expected an integer")),
        ColumnKind::Year => match integer(raw) {
            Some(year) if (1..=9999).contains(&year) => Ok(FieldValue::Integer(year)),
            _ => Err(invalid("expected a year between 1 and 9999")),
        },
    }
}

fn integer(raw: &Value) -> Option<i64> {
    if let Some(n) = raw.as_i64() {
        return Some(n);
    }
    finite_number(raw)
        .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
        .map(|n| n as i64)
}

fn finite_number(raw: &Value) -> Option<f64> {
    raw.as_f64().filter(|n| n.is_finite())
}

/// True for a zero-padded YYYY-MM-DD string naming a real day
pub fn is_date_key(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// True for a YYYY-MM string naming a real month
pub fn is_month_key(s: &str) -> bool {
    s.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").is_ok()
}
