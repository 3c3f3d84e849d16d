//! Mutation Repository
//!
//! Applies validated upsert/delete commands. Table and column names come from
//! the static allow-list, values are always bound as parameters.

use async_trait::async_trait;
use rusqlite::types::Value;

use crate::domain::{DomainError, DomainResult, FieldValue, MutationCommand, Row, Table};
use super::db::SharedConnection;
use super::traits::MutationSink;

/// SQLite implementation of the generic mutation writer
#[derive(Clone)]
pub struct MutationRepository {
    conn: SharedConnection,
}

impl MutationRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Real(n) => Value::Real(*n),
        FieldValue::Integer(n) => Value::Integer(*n),
    }
}

/// INSERT ... ON CONFLICT(pk) DO UPDATE over the supplied columns only
fn upsert_statement(table: Table, row: &Row) -> (String, Vec<Value>) {
    let key = table.primary_key();
    let columns: Vec<&str> = row.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|name| **name != key)
        .map(|name| format!("{0} = excluded.{0}", name))
        .collect();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table.name(),
        columns.join(", "),
        placeholders.join(", "),
        key,
        conflict
    );
    let values = row.iter().map(|(_, value)| to_sql_value(value)).collect();
    (sql, values)
}

/// DELETE matching every filter field; NULL matches IS NULL
fn delete_statement(table: Table, filter: &Row) -> (String, Vec<Value>) {
    let mut clauses = Vec::with_capacity(filter.len());
    let mut values = Vec::with_capacity(filter.len());

    for (name, value) in filter.iter() {
        if *value == FieldValue::Null {
            clauses.push(format!("{} IS NULL", name));
        } else {
            values.push(to_sql_value(value));
            clauses.push(format!("{} = ?{}", name, values.len()));
        }
    }

    let sql = format!("DELETE FROM {} WHERE {}", table.name(), clauses.join(" AND "));
    (sql, values)
}

#[async_trait]
impl MutationSink for MutationRepository {
    async fn apply(&self, command: &MutationCommand) -> DomainResult<usize> {
        let (sql, values) = match command {
            MutationCommand::Upsert { table, row } => upsert_statement(*table, row),
            MutationCommand::Delete { table, filter } => {
                if filter.is_empty() {
                    return Err(DomainError::InvalidInput(
                        "delete requires a filter".to_string(),
                    ));
                }
                delete_statement(*table, filter)
            }
        };

        let conn = self.conn.lock().await;
        let changed = conn
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        log::info!(
            "{} on {}: {} row(s)",
            command.action().as_str(),
            command.table(),
            changed
        );
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MutationRequest;
    use serde_json::json;

    fn command(table: &str, action: &str, payload: serde_json::Value) -> MutationCommand {
        MutationCommand::from_request(&MutationRequest {
            table: table.to_string(),
            action: action.to_string(),
            payload,
        })
        .unwrap()
    }

    #[test]
    fn test_upsert_statement_updates_supplied_columns() {
        let cmd = command("clients", "upsert", json!({ "id": "c1", "default_tjm": 700 }));
        let MutationCommand::Upsert { table, row } = cmd else {
            panic!("expected upsert");
        };
        let (sql, values) = upsert_statement(table, &row);
        assert_eq!(
            sql,
            "INSERT INTO clients (id, default_tjm) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET default_tjm = excluded.default_tjm"
        );
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_key_only_upsert_does_nothing_on_conflict() {
        let cmd = command("salaries", "upsert", json!({ "month_str": "2025-03" }));
        let MutationCommand::Upsert { table, row } = cmd else {
            panic!("expected upsert");
        };
        let (sql, _) = upsert_statement(table, &row);
        assert!(sql.ends_with("ON CONFLICT(month_str) DO NOTHING"));
    }

    #[test]
    fn test_delete_statement_handles_null() {
        let cmd = command(
            "work_days",
            "delete",
            json!({ "date": "2025-03-03", "client_id": null }),
        );
        let MutationCommand::Delete { table, filter } = cmd else {
            panic!("expected delete");
        };
        let (sql, values) = delete_statement(table, &filter);
        assert_eq!(sql, "DELETE FROM work_days WHERE date = ?1 AND client_id IS NULL");
        assert_eq!(values, vec![Value::Text("2025-03-03".to_string())]);
    }
}
