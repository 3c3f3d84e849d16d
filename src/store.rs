//! Application Store
//!
//! The whole ledger lives in memory behind a lock. Every action validates its
//! input, updates memory synchronously and queues the matching remote
//! mutation in the outbox. Remote failures never roll memory back; they are
//! logged and reported on the returned [`MutationTicket`]. The next `init`
//! replaces memory with the remote snapshot.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::NaiveDate;

use crate::commands::{ApiError, Mutation, RemoteBackend, Table};
use crate::models::{
    AnnualCharge, Client, ClientPatch, Expense, ExpensePatch, Ledger, Settings, SettingsPatch, WorkDay,
};
use crate::outbox::{MutationTicket, Outbox};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    InvalidInput(String),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

// ========================
// Validation
// ========================

fn check_id(field: &str, id: &str) -> StoreResult<()> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn check_date(date: &str) -> StoreResult<()> {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(_) if date.len() == 10 => Ok(()),
        _ => Err(StoreError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", date))),
    }
}

fn check_month(month: &str) -> StoreResult<()> {
    match NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d") {
        Ok(_) if month.len() == 7 => Ok(()),
        _ => Err(StoreError::InvalidInput(format!("Invalid month '{}', expected YYYY-MM", month))),
    }
}

fn check_finite(field: &str, value: f64) -> StoreResult<()> {
    if !value.is_finite() {
        return Err(StoreError::InvalidInput(format!("{} must be a number", field)));
    }
    Ok(())
}

fn check_amount(field: &str, value: f64) -> StoreResult<()> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(StoreError::InvalidInput(format!("{} must not be negative", field)));
    }
    Ok(())
}

fn validate_client(client: &Client) -> StoreResult<()> {
    check_id("client id", &client.id)?;
    check_id("client name", &client.name)?;
    check_amount("defaultTjm", client.default_tjm)
}

fn validate_expense(expense: &Expense) -> StoreResult<()> {
    check_id("expense id", &expense.id)?;
    check_date(&expense.date)?;
    check_amount("amountHt", expense.amount_ht)?;
    check_amount("tva", expense.tva)
}

fn validate_settings(settings: &Settings) -> StoreResult<()> {
    check_amount("socialContributionRate", settings.social_contribution_rate)?;
    check_amount("incomeTaxRate", settings.income_tax_rate)
}

fn validate_annual_charge(charge: &AnnualCharge) -> StoreResult<()> {
    check_id("annual charge id", &charge.id)?;
    check_id("annual charge label", &charge.label)?;
    check_amount("amountHt", charge.amount_ht)?;
    if !(1..=9999).contains(&charge.year) {
        return Err(StoreError::InvalidInput(format!("Invalid year {}", charge.year)));
    }
    Ok(())
}

/// Replace the element with the same key, or append it
fn put<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

pub struct AppStore {
    state: RwLock<Ledger>,
    remote: Arc<dyn RemoteBackend>,
    outbox: Outbox,
}

impl AppStore {
    /// Must be called from within a tokio runtime (spawns the outbox worker)
    pub fn new(remote: Arc<dyn RemoteBackend>) -> Self {
        Self {
            state: RwLock::new(Ledger::default()),
            outbox: Outbox::spawn(remote.clone()),
            remote,
        }
    }

    /// Replace memory with the remote snapshot. On failure memory is left
    /// untouched.
    pub async fn init(&self) -> Result<(), ApiError> {
        match self.remote.fetch_snapshot().await {
            Ok(ledger) => {
                log::info!(
                    "Snapshot loaded: {} clients, {} work days, {} expenses",
                    ledger.clients.len(),
                    ledger.work_days.len(),
                    ledger.expenses.len()
                );
                *self.write() = ledger;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load snapshot: {}", e);
                Err(e)
            }
        }
    }

    /// Close the outbox and wait for queued mutations to finish
    pub async fn dispose(&self) {
        self.outbox.close().await;
    }

    pub fn snapshot(&self) -> Ledger {
        self.read(Ledger::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn settings(&self) -> Settings {
        self.read(|ledger| ledger.settings.clone())
    }

    pub fn pending_mutations(&self) -> usize {
        self.outbox.pending()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================
    // Clients
    // ========================

    /// Insert, or replace the client with the same id
    pub fn add_client(&self, client: Client) -> StoreResult<MutationTicket> {
        validate_client(&client)?;
        let mutation = Mutation::upsert_client(&client);
        let id = client.id.clone();
        put(&mut self.write().clients, client, |c| c.id == id);
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn update_client(&self, id: &str, patch: ClientPatch) -> StoreResult<MutationTicket> {
        let mutation = {
            let mut state = self.write();
            let client = state
                .clients
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("client {}", id)))?;
            let mut updated = client.clone();
            patch.apply_to(&mut updated);
            validate_client(&updated)?;
            *client = updated;
            Mutation::upsert_client(client)
        };
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn delete_client(&self, id: &str) -> StoreResult<MutationTicket> {
        check_id("client id", id)?;
        self.write().clients.retain(|c| c.id != id);
        Ok(self.outbox.enqueue(Mutation::delete_client(id)))
    }

    // ========================
    // Work days
    // ========================

    /// Record `date`; the key wins over `work_day.date`
    pub fn set_work_day(&self, date: &str, work_day: WorkDay) -> StoreResult<MutationTicket> {
        check_date(date)?;
        check_amount("tjm", work_day.tjm)?;
        let work_day = WorkDay {
            date: date.to_string(),
            client_id: work_day.client_id.filter(|id| !id.is_empty()),
            tjm: work_day.tjm,
        };
        let mutation = Mutation::upsert_work_day(&work_day);
        self.write().work_days.insert(date.to_string(), work_day);
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn remove_work_day(&self, date: &str) -> StoreResult<MutationTicket> {
        check_date(date)?;
        self.write().work_days.remove(date);
        Ok(self.outbox.enqueue(Mutation::delete_work_day(date)))
    }

    // ========================
    // Expenses
    // ========================

    pub fn add_expense(&self, expense: Expense) -> StoreResult<MutationTicket> {
        validate_expense(&expense)?;
        let mutation = Mutation::upsert_expense(&expense);
        let id = expense.id.clone();
        put(&mut self.write().expenses, expense, |e| e.id == id);
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn update_expense(&self, id: &str, patch: ExpensePatch) -> StoreResult<MutationTicket> {
        let mutation = {
            let mut state = self.write();
            let expense = state
                .expenses
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("expense {}", id)))?;
            let mut updated = expense.clone();
            patch.apply_to(&mut updated);
            validate_expense(&updated)?;
            *expense = updated;
            Mutation::upsert_expense(expense)
        };
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn delete_expense(&self, id: &str) -> StoreResult<MutationTicket> {
        check_id("expense id", id)?;
        self.write().expenses.retain(|e| e.id != id);
        Ok(self.outbox.enqueue(Mutation::delete_expense(id)))
    }

    // ========================
    // Settings and monthly amounts
    // ========================

    pub fn update_settings(&self, patch: SettingsPatch) -> StoreResult<MutationTicket> {
        let mutation = {
            let mut state = self.write();
            let mut updated = state.settings.clone();
            patch.apply_to(&mut updated);
            validate_settings(&updated)?;
            let mutation = Mutation::upsert_settings(&updated);
            state.settings = updated;
            mutation
        };
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn set_salary(&self, month: &str, amount: f64) -> StoreResult<MutationTicket> {
        self.set_monthly(Table::Salaries, month, amount)
    }

    pub fn set_paid_revenue(&self, month: &str, amount: f64) -> StoreResult<MutationTicket> {
        self.set_monthly(Table::PaidRevenues, month, amount)
    }

    pub fn set_one_off_revenue(&self, month: &str, amount: f64) -> StoreResult<MutationTicket> {
        self.set_monthly(Table::OneOffRevenues, month, amount)
    }

    fn set_monthly(&self, table: Table, month: &str, amount: f64) -> StoreResult<MutationTicket> {
        check_month(month)?;
        check_finite("amount", amount)?;
        {
            let mut state = self.write();
            let amounts = match table {
                Table::Salaries => &mut state.salaries,
                Table::PaidRevenues => &mut state.paid_revenues,
                _ => &mut state.one_off_revenues,
            };
            amounts.insert(month.to_string(), amount);
        }
        Ok(self.outbox.enqueue(Mutation::upsert_monthly(table, month, amount)))
    }

    // ========================
    // Annual charges
    // ========================

    /// Insert, or replace the charge with the same id
    pub fn add_annual_charge(&self, charge: AnnualCharge) -> StoreResult<MutationTicket> {
        validate_annual_charge(&charge)?;
        let mutation = Mutation::upsert_annual_charge(&charge);
        let id = charge.id.clone();
        put(&mut self.write().annual_charges, charge, |c| c.id == id);
        Ok(self.outbox.enqueue(mutation))
    }

    pub fn delete_annual_charge(&self, id: &str) -> StoreResult<MutationTicket> {
        check_id("annual charge id", id)?;
        self.write().annual_charges.retain(|c| c.id != id);
        Ok(self.outbox.enqueue(Mutation::delete_annual_charge(id)))
    }
}
