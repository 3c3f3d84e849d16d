//! Ledger Repository
//!
//! Typed reads over the eight ledger tables and the sync snapshot built from
//! them.

use async_trait::async_trait;
use rusqlite::ToSql;

use crate::domain::{
    AnnualCharge, Client, DomainError, DomainResult, Entity, Expense, ExpenseCategory,
    MonthlyAmount, Settings, SnapshotParts, SyncSnapshot, Table, WorkDay, SETTINGS_ID,
};
use super::db::SharedConnection;
use super::traits::{Repository, SnapshotSource};

fn internal(e: rusqlite::Error) -> DomainError {
    DomainError::Internal(e.to_string())
}

/// Entities stored one per row of a fixed table
pub trait LedgerRow: Entity {
    const SELECT: &'static str;
    const ORDER: &'static str;

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>;
}

impl LedgerRow for Client {
    const SELECT: &'static str = "SELECT id, name, default_tjm FROM clients";
    const ORDER: &'static str = "name";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            default_tjm: row.get(2)?,
        })
    }
}

impl LedgerRow for WorkDay {
    const SELECT: &'static str = "SELECT date, client_id, tjm FROM work_days";
    const ORDER: &'static str = "date";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(WorkDay {
            date: row.get(0)?,
            client_id: row.get(1)?,
            tjm: row.get(2)?,
        })
    }
}

impl LedgerRow for Expense {
    const SELECT: &'static str =
        "SELECT id, date, description, amount_ht, tva, category, client_name, receipt_url FROM expenses";
    const ORDER: &'static str = "date DESC, id";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let category: Option<String> = row.get(5)?;
        Ok(Expense {
            id: row.get(0)?,
            date: row.get(1)?,
            description: row.get(2)?,
            amount_ht: row.get(3)?,
            tva: row.get(4)?,
            category: category.map(|label| ExpenseCategory::from_label(&label)),
            client_name: row.get(6)?,
            receipt_url: row.get(7)?,
        })
    }
}

impl LedgerRow for AnnualCharge {
    const SELECT: &'static str =
        "SELECT id, label, amount_ht, year, document_url FROM annual_charges";
    const ORDER: &'static str = "year DESC, label";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(AnnualCharge {
            id: row.get(0)?,
            label: row.get(1)?,
            amount_ht: row.get(2)?,
            year: row.get(3)?,
            document_url: row.get(4)?,
        })
    }
}

impl LedgerRow for Settings {
    const SELECT: &'static str =
        "SELECT social_contribution_rate, income_tax_rate FROM settings";
    const ORDER: &'static str = "id";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Settings {
            social_contribution_rate: row.get(0)?,
            income_tax_rate: row.get(1)?,
        })
    }
}

/// SQLite implementation of the ledger reads
#[derive(Clone)]
pub struct LedgerRepository {
    conn: SharedConnection,
}

impl LedgerRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Reader for one of the month-keyed tables
    pub fn monthly(&self, table: Table) -> DomainResult<MonthlyRepository> {
        match table {
            Table::Salaries | Table::PaidRevenues | Table::OneOffRevenues => Ok(MonthlyRepository {
                conn: self.conn.clone(),
                table,
            }),
            other => Err(DomainError::InvalidInput(format!(
                "{} is not a monthly table",
                other
            ))),
        }
    }
}

#[async_trait]
impl<T> Repository<T> for LedgerRepository
where
    T: LedgerRow + 'static,
    T::Key: ToSql,
{
    async fn find_by_id(&self, id: T::Key) -> DomainResult<Option<T>> {
        let conn = self.conn.lock().await;
        let sql = format!("{} WHERE {} = ?1", T::SELECT, T::KEY_COLUMN);

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt.query([&id as &dyn ToSql]).map_err(internal)?;

        match rows.next().map_err(internal)? {
            Some(row) => Ok(Some(T::from_row(row).map_err(internal)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<T>> {
        let conn = self.conn.lock().await;
        let sql = format!("{} ORDER BY {}", T::SELECT, T::ORDER);

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let rows = stmt.query_map([], |row| T::from_row(row)).map_err(internal)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(internal)
    }
}

/// Reads one of salaries, paid_revenues or one_off_revenues
pub struct MonthlyRepository {
    conn: SharedConnection,
    table: Table,
}

impl MonthlyRepository {
    pub fn table(&self) -> Table {
        self.table
    }
}

fn monthly_from_row(row: &rusqlite::Row) -> rusqlite::Result<MonthlyAmount> {
    Ok(MonthlyAmount {
        month_str: row.get(0)?,
        amount: row.get(1)?,
    })
}

#[async_trait]
impl Repository<MonthlyAmount> for MonthlyRepository {
    async fn find_by_id(&self, id: String) -> DomainResult<Option<MonthlyAmount>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT month_str, amount FROM {} WHERE month_str = ?1",
            self.table.name()
        );

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt.query([&id]).map_err(internal)?;

        match rows.next().map_err(internal)? {
            Some(row) => Ok(Some(monthly_from_row(row).map_err(internal)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DomainResult<Vec<MonthlyAmount>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT month_str, amount FROM {} ORDER BY month_str",
            self.table.name()
        );

        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let rows = stmt.query_map([], monthly_from_row).map_err(internal)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(internal)
    }
}

#[async_trait]
impl SnapshotSource for LedgerRepository {
    async fn load_snapshot(&self) -> DomainResult<SyncSnapshot> {
        let salary_repo = self.monthly(Table::Salaries)?;
        let paid_repo = self.monthly(Table::PaidRevenues)?;
        let one_off_repo = self.monthly(Table::OneOffRevenues)?;

        let (
            clients,
            work_days,
            expenses,
            settings,
            salaries,
            paid_revenues,
            one_off_revenues,
            annual_charges,
        ) = tokio::try_join!(
            Repository::<Client>::list(self),
            Repository::<WorkDay>::list(self),
            Repository::<Expense>::list(self),
            Repository::<Settings>::find_by_id(self, SETTINGS_ID),
            salary_repo.list(),
            paid_repo.list(),
            one_off_repo.list(),
            Repository::<AnnualCharge>::list(self),
        )?;

        Ok(SyncSnapshot::assemble(SnapshotParts {
            clients,
            work_days,
            expenses,
            settings,
            salaries,
            paid_revenues,
            one_off_revenues,
            annual_charges,
        }))
    }
}
