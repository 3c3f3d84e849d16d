//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DEFAULT_INCOME_TAX_RATE, DEFAULT_SOCIAL_CONTRIBUTION_RATE, SETTINGS_ID};

/// Shared connection handle used by every repository
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Database state wrapper
pub struct DbState {
    conn: SharedConnection,
}

impl DbState {
    /// Get a handle on the connection
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }
}

/// Initialize database with path (`:memory:` for an in-memory database)
pub async fn init_db(db_path: &Path) -> Result<DbState, String> {
    let db_path_str = db_path.to_str().ok_or("Invalid DB path")?;

    let conn = if db_path_str == ":memory:" {
        Connection::open_in_memory()
    } else {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create db directory: {}", e))?;
            }
        }
        Connection::open(db_path)
    }
    .map_err(|e| format!("Failed to open db: {}", e))?;

    // Run migrations
    run_migrations(&conn)?;

    log::info!("Database ready at {}", db_path_str);

    Ok(DbState {
        conn: Arc::new(Mutex::new(conn)),
    })
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS clients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            default_tjm REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS work_days (
            date TEXT PRIMARY KEY,
            client_id TEXT,
            tjm REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            amount_ht REAL NOT NULL DEFAULT 0,
            tva REAL NOT NULL DEFAULT 0,
            category TEXT,
            receipt_url TEXT
        );

        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            social_contribution_rate REAL NOT NULL DEFAULT 45,
            income_tax_rate REAL NOT NULL DEFAULT 11
        );

        CREATE TABLE IF NOT EXISTS salaries (
            month_str TEXT PRIMARY KEY,
            amount REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS paid_revenues (
            month_str TEXT PRIMARY KEY,
            amount REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS one_off_revenues (
            month_str TEXT PRIMARY KEY,
            amount REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS annual_charges (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL DEFAULT '',
            amount_ht REAL NOT NULL DEFAULT 0,
            year INTEGER NOT NULL DEFAULT 0
        );",
    )
    .map_err(|e| e.to_string())?;

    // Columns added after the first release
    if !column_exists(conn, "expenses", "client_name") {
        conn.execute("ALTER TABLE expenses ADD COLUMN client_name TEXT", [])
            .map_err(|e| format!("Failed to add client_name: {}", e))?;
    }

    if !column_exists(conn, "annual_charges", "document_url") {
        conn.execute("ALTER TABLE annual_charges ADD COLUMN document_url TEXT", [])
            .map_err(|e| format!("Failed to add document_url: {}", e))?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )
    .map_err(|e| e.to_string())?;

    // The settings singleton always exists
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, social_contribution_rate, income_tax_rate) VALUES (?1, ?2, ?3)",
        rusqlite::params![SETTINGS_ID, DEFAULT_SOCIAL_CONTRIBUTION_RATE, DEFAULT_INCOME_TAX_RATE],
    )
    .map_err(|e| format!("Failed to seed settings: {}", e))?;

    Ok(())
}
