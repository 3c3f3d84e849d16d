//! Domain Layer
//!
//! Ledger entities, the sync snapshot and validated mutation commands.
//! This layer has NO storage or HTTP dependencies.

mod entity;
mod client;
mod work_day;
mod expense;
mod annual_charge;
mod settings;
mod monthly_amount;
mod snapshot;
mod mutation;

pub use entity::{Entity, DomainError, DomainResult};
pub use client::Client;
pub use work_day::WorkDay;
pub use expense::{Expense, ExpenseCategory};
pub use annual_charge::AnnualCharge;
pub use settings::{Settings, SETTINGS_ID, DEFAULT_INCOME_TAX_RATE, DEFAULT_SOCIAL_CONTRIBUTION_RATE};
pub use monthly_amount::MonthlyAmount;
pub use snapshot::{SnapshotParts, SyncSnapshot};
pub use mutation::{
    is_date_key, is_month_key, Column, ColumnKind, FieldValue, MutationAction, MutationCommand,
    MutationRequest, Row, Table,
};
