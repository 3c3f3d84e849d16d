//! Sync Snapshot
//!
//! Aggregate of all eight tables in the shape the client store consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::{AnnualCharge, Client, Expense, MonthlyAmount, Settings, WorkDay};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSnapshot {
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

/// Raw table contents, as read from storage
#[derive(Debug, Default)]
pub struct SnapshotParts {
    pub clients: Vec<Client>,
    pub work_days: Vec<WorkDay>,
    pub expenses: Vec<Expense>,
    pub settings: Option<Settings>,
    pub salaries: Vec<MonthlyAmount>,
    pub paid_revenues: Vec<MonthlyAmount>,
    pub one_off_revenues: Vec<MonthlyAmount>,
    pub annual_charges: Vec<AnnualCharge>,
}

fn by_month(rows: Vec<MonthlyAmount>) -> BTreeMap<String, f64> {
    rows.into_iter().map(|row| (row.key(), row.amount)).collect()
}

impl SyncSnapshot {
    /// Reshape table rows into the keyed snapshot; a missing settings row
    /// falls back to the default rates.
    pub fn assemble(parts: SnapshotParts) -> Self {
        Self {
            clients: parts.clients,
            work_days: parts
                .work_days
                .into_iter()
                .map(|day| (day.key(), day))
                .collect(),
            expenses: parts.expenses,
            settings: parts.settings.unwrap_or_default(),
            salaries: by_month(parts.salaries),
            paid_revenues: by_month(parts.paid_revenues),
            one_off_revenues: by_month(parts.one_off_revenues),
            annual_charges: parts.annual_charges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_keys_rows() {
        let snapshot = SyncSnapshot::assemble(SnapshotParts {
            work_days: vec![
                WorkDay::billed("2025-03-03", Some("TF1".to_string()), 650.0),
                WorkDay::not_worked("2025-03-04"),
            ],
            salaries: vec![MonthlyAmount::new("2025-03", 3000.0)],
            ..SnapshotParts::default()
        });

        assert_eq!(snapshot.work_days.len(), 2);
        assert_eq!(snapshot.work_days["2025-03-04"].tjm, 0.0);
        assert_eq!(snapshot.salaries["2025-03"], 3000.0);
        assert_eq!(snapshot.settings, Settings::default());
    }

    #[test]
    fn test_snapshot_json_uses_camel_case_keys() {
        let json = serde_json::to_value(SyncSnapshot::default()).unwrap();
        for key in [
            "clients",
            "workDays",
            "expenses",
            "settings",
            "salaries",
            "paidRevenues",
            "oneOffRevenues",
            "annualCharges",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["settings"]["socialContributionRate"], 45.0);
    }
}
