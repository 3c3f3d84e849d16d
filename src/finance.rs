//! Derived Figures
//!
//! Revenue, tax and treasury estimates computed from a [`Ledger`]. Nothing
//! here is stored; every figure is recomputed from the current state.

use std::collections::BTreeMap;

use crate::models::{Expense, ExpenseCategory, Ledger, Settings, WorkDay};

/// Share of leftover treasury taken by the flat tax
pub const FLAT_TAX_RATE: f64 = 0.30;

pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

fn days_of_month(ledger: &Ledger, year: i32, month: u32) -> impl Iterator<Item = &WorkDay> {
    let prefix = format!("{}-", month_key(year, month));
    ledger
        .work_days
        .iter()
        .filter(move |(date, _)| date.starts_with(prefix.as_str()))
        .map(|(_, day)| day)
}

/// Sum of the TJM of every recorded day of the month
pub fn monthly_revenue(ledger: &Ledger, year: i32, month: u32) -> f64 {
    days_of_month(ledger, year, month).map(|day| day.tjm).sum()
}

pub fn billed_days(ledger: &Ledger, year: i32, month: u32) -> usize {
    days_of_month(ledger, year, month).filter(|day| day.is_billed()).count()
}

/// Days explicitly recorded with `tjm == 0`
pub fn not_worked_days(ledger: &Ledger, year: i32, month: u32) -> usize {
    days_of_month(ledger, year, month).filter(|day| day.tjm == 0.0).count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthFigures {
    /// 1..=12
    pub month: u32,
    pub billed: f64,
    pub collected: f64,
}

pub fn revenue_series(ledger: &Ledger, year: i32) -> Vec<MonthFigures> {
    (1..=12)
        .map(|month| MonthFigures {
            month,
            billed: monthly_revenue(ledger, year, month),
            collected: ledger
                .paid_revenues
                .get(&month_key(year, month))
                .copied()
                .unwrap_or(0.0),
        })
        .collect()
}

fn sum_for_year(amounts: &BTreeMap<String, f64>, year: i32) -> f64 {
    let prefix = format!("{:04}-", year);
    amounts
        .iter()
        .filter(|(month, _)| month.starts_with(prefix.as_str()))
        .map(|(_, amount)| amount)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearSummary {
    pub year: i32,
    pub billed_ht: f64,
    pub one_off_ht: f64,
    pub collected_ht: f64,
    pub expenses_ht: f64,
    pub annual_charges_ht: f64,
    pub gross_salaries: f64,
    pub social_contributions: f64,
    pub income_tax: f64,
    pub net_after_tax: f64,
    /// collected - expenses - salaries
    pub remaining_treasury: f64,
    pub flat_tax: f64,
    pub net_treasury: f64,
}

impl YearSummary {
    pub fn total_billed_ht(&self) -> f64 {
        self.billed_ht + self.one_off_ht
    }
}

pub fn year_summary(ledger: &Ledger, year: i32) -> YearSummary {
    let settings = &ledger.settings;
    let billed_ht = revenue_series(ledger, year).iter().map(|m| m.billed).sum();
    let year_prefix = format!("{:04}", year);
    let expenses_ht = ledger
        .expenses
        .iter()
        .filter(|e| e.date.starts_with(year_prefix.as_str()))
        .map(|e| e.amount_ht)
        .sum();
    let gross_salaries = sum_for_year(&ledger.salaries, year);
    let collected_ht = sum_for_year(&ledger.paid_revenues, year);

    let social_contributions = gross_salaries * settings.social_contribution_rate / 100.0;
    let income_tax = gross_salaries * settings.income_tax_rate / 100.0;
    let remaining_treasury = collected_ht - expenses_ht - gross_salaries;
    let (flat_tax, net_treasury) = split_treasury(remaining_treasury);

    YearSummary {
        year,
        billed_ht,
        one_off_ht: sum_for_year(&ledger.one_off_revenues, year),
        collected_ht,
        expenses_ht,
        annual_charges_ht: annual_charges_total(ledger, year),
        gross_salaries,
        social_contributions,
        income_tax,
        net_after_tax: gross_salaries - social_contributions - income_tax,
        remaining_treasury,
        flat_tax,
        net_treasury,
    }
}

/// Flat tax and what is left of a positive treasury; zero for a deficit
fn split_treasury(treasury: f64) -> (f64, f64) {
    if treasury > 0.0 {
        (treasury * FLAT_TAX_RATE, treasury * (1.0 - FLAT_TAX_RATE))
    } else {
        (0.0, 0.0)
    }
}

/// Net salary after contributions and income tax
pub fn net_income(gross: f64, settings: &Settings) -> f64 {
    gross - gross * settings.social_contribution_rate / 100.0 - gross * settings.income_tax_rate / 100.0
}

/// Gross salary needed to pay `net`; 0 when the combined rate reaches 100%
pub fn gross_from_net(net: f64, settings: &Settings) -> f64 {
    let combined = (settings.social_contribution_rate + settings.income_tax_rate) / 100.0;
    if combined < 1.0 {
        net / (1.0 - combined)
    } else {
        0.0
    }
}

// ========================
// Breakdown
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownKind {
    Charges,
    Contributions,
    IncomeTax,
    FlatTax,
    Treasury,
    Net,
}

impl BreakdownKind {
    pub fn label(self) -> &'static str {
        match self {
            BreakdownKind::Charges => "Charges",
            BreakdownKind::Contributions => "Cotis.",
            BreakdownKind::IncomeTax => "IR",
            BreakdownKind::FlatTax => "Flat Tax",
            BreakdownKind::Treasury => "Tréso.",
            BreakdownKind::Net => "Net",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownEntry {
    pub kind: BreakdownKind,
    pub value: f64,
    /// Fraction of the whole breakdown
    pub share: f64,
}

fn breakdown(parts: [(BreakdownKind, f64); 6]) -> Vec<BreakdownEntry> {
    let total = parts.iter().map(|(_, value)| value).sum::<f64>().max(1.0);
    parts
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(kind, value)| BreakdownEntry {
            kind,
            value,
            share: value / total,
        })
        .collect()
}

/// Where a year's money went; only positive entries are kept
pub fn revenue_breakdown(summary: &YearSummary) -> Vec<BreakdownEntry> {
    breakdown([
        (BreakdownKind::Charges, summary.expenses_ht),
        (BreakdownKind::Contributions, summary.social_contributions),
        (BreakdownKind::IncomeTax, summary.income_tax),
        (BreakdownKind::FlatTax, summary.flat_tax),
        (BreakdownKind::Treasury, summary.net_treasury),
        (BreakdownKind::Net, summary.net_after_tax),
    ])
}

// ========================
// Salary simulator
// ========================

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub annual_net: f64,
    pub annual_gross: f64,
    pub monthly_gross: f64,
    pub social_contributions: f64,
    pub income_tax: f64,
    pub treasury: f64,
    pub flat_tax: f64,
    pub net_treasury: f64,
    pub expenses: f64,
}

impl Simulation {
    pub fn breakdown(&self) -> Vec<BreakdownEntry> {
        breakdown([
            (BreakdownKind::Charges, self.expenses),
            (BreakdownKind::Contributions, self.social_contributions),
            (BreakdownKind::IncomeTax, self.income_tax),
            (BreakdownKind::FlatTax, self.flat_tax),
            (BreakdownKind::Treasury, self.net_treasury),
            (BreakdownKind::Net, self.annual_net),
        ])
    }
}

/// Project a year from a revenue, a monthly net salary and total expenses
pub fn simulate(revenue: f64, monthly_net_salary: f64, expenses: f64, settings: &Settings) -> Simulation {
    let annual_net = monthly_net_salary * 12.0;
    let annual_gross = gross_from_net(annual_net, settings);
    let treasury = revenue - expenses - annual_gross;
    let (flat_tax, net_treasury) = split_treasury(treasury);

    Simulation {
        annual_net,
        annual_gross,
        monthly_gross: annual_gross / 12.0,
        social_contributions: annual_gross * settings.social_contribution_rate / 100.0,
        income_tax: annual_gross * settings.income_tax_rate / 100.0,
        treasury,
        flat_tax,
        net_treasury,
        expenses,
    }
}

// ========================
// Annual charges and expenses
// ========================

pub fn annual_charges_total(ledger: &Ledger, year: i32) -> f64 {
    ledger
        .annual_charges
        .iter()
        .filter(|charge| charge.year == year)
        .map(|charge| charge.amount_ht)
        .sum()
}

/// Monthly share of a yearly amount, rounded to the euro
pub fn monthly_amortization(amount_ht: f64) -> f64 {
    (amount_ht / 12.0).round()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthExpenses {
    pub total_ht: f64,
    pub total_ttc: f64,
    /// Expenses without a category fall under "Autre"
    pub by_category: BTreeMap<ExpenseCategory, Vec<Expense>>,
}

/// Expenses grouped by YYYY-MM, then by category
pub fn expenses_by_month(ledger: &Ledger) -> BTreeMap<String, MonthExpenses> {
    let mut months: BTreeMap<String, MonthExpenses> = BTreeMap::new();
    for expense in &ledger.expenses {
        let entry = months.entry(expense.month().to_string()).or_default();
        entry.total_ht += expense.amount_ht;
        entry.total_ttc += expense.amount_ttc();
        let category = expense.category.clone().unwrap_or(ExpenseCategory::Other);
        entry.by_category.entry(category).or_default().push(expense.clone());
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnualCharge;

    fn ledger_with_march() -> Ledger {
        let mut ledger = Ledger::default();
        for date in ["2025-03-03", "2025-03-04", "2025-03-05"] {
            ledger
                .work_days
                .insert(date.to_string(), WorkDay::billed(date, "TF1", 650.0));
        }
        ledger
            .work_days
            .insert("2025-03-06".to_string(), WorkDay::not_worked("2025-03-06"));
        ledger
            .work_days
            .insert("2025-04-01".to_string(), WorkDay::billed("2025-04-01", "TF1", 700.0));
        ledger
    }

    #[test]
    fn test_monthly_counts() {
        let ledger = ledger_with_march();
        assert_eq!(monthly_revenue(&ledger, 2025, 3), 1950.0);
        assert_eq!(billed_days(&ledger, 2025, 3), 3);
        assert_eq!(not_worked_days(&ledger, 2025, 3), 1);
        // Absent dates are neither billed nor off
        assert_eq!(billed_days(&ledger, 2025, 5), 0);
        assert_eq!(not_worked_days(&ledger, 2025, 5), 0);
    }

    #[test]
    fn test_revenue_series() {
        let mut ledger = ledger_with_march();
        ledger.paid_revenues.insert("2025-04".to_string(), 1950.0);

        let series = revenue_series(&ledger, 2025);
        assert_eq!(series.len(), 12);
        assert_eq!(series[2].billed, 1950.0);
        assert_eq!(series[3].billed, 700.0);
        assert_eq!(series[3].collected, 1950.0);
        assert_eq!(series[0], MonthFigures { month: 1, billed: 0.0, collected: 0.0 });
    }

    #[test]
    fn test_net_income_follows_settings() {
        let settings = Settings {
            social_contribution_rate: 50.0,
            income_tax_rate: 11.0,
        };
        assert_eq!(net_income(3000.0, &settings), 1170.0);
    }

    #[test]
    fn test_year_summary() {
        let mut ledger = ledger_with_march();
        ledger.paid_revenues.insert("2025-04".to_string(), 20000.0);
        ledger.paid_revenues.insert("2024-12".to_string(), 999.0);
        ledger.salaries.insert("2025-03".to_string(), 3000.0);
        ledger.one_off_revenues.insert("2025-06".to_string(), 500.0);
        ledger.expenses.push(Expense {
            id: "e1".to_string(),
            date: "2025-02-10".to_string(),
            description: "Laptop".to_string(),
            amount_ht: 1000.0,
            tva: 200.0,
            category: Some(ExpenseCategory::Equipment),
            client_name: None,
            receipt_url: None,
        });

        let summary = year_summary(&ledger, 2025);
        assert_eq!(summary.billed_ht, 2650.0);
        assert_eq!(summary.total_billed_ht(), 3150.0);
        assert_eq!(summary.collected_ht, 20000.0);
        assert_eq!(summary.expenses_ht, 1000.0);
        assert_eq!(summary.social_contributions, 1350.0);
        assert_eq!(summary.income_tax, 330.0);
        assert_eq!(summary.net_after_tax, 1320.0);
        assert_eq!(summary.remaining_treasury, 16000.0);
        assert!((summary.flat_tax - 4800.0).abs() < 1e-9);
        assert!((summary.net_treasury - 11200.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_keeps_positive_entries() {
        let summary = YearSummary {
            expenses_ht: 1000.0,
            remaining_treasury: -500.0,
            ..Default::default()
        };
        let entries = revenue_breakdown(&summary);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind.label(), "Charges");
        assert_eq!(entries[0].share, 1.0);

        assert!(revenue_breakdown(&YearSummary::default()).is_empty());
    }

    #[test]
    fn test_simulator() {
        let settings = Settings {
            social_contribution_rate: 45.0,
            income_tax_rate: 5.0,
        };
        let sim = simulate(100000.0, 3000.0, 5000.0, &settings);
        assert_eq!(sim.annual_net, 36000.0);
        assert_eq!(sim.annual_gross, 72000.0);
        assert_eq!(sim.monthly_gross, 6000.0);
        assert_eq!(sim.treasury, 23000.0);

        let saturated = Settings {
            social_contribution_rate: 80.0,
            income_tax_rate: 20.0,
        };
        assert_eq!(gross_from_net(36000.0, &saturated), 0.0);
        let kinds: Vec<_> = simulate(0.0, 3000.0, 0.0, &saturated)
            .breakdown()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, [BreakdownKind::Net]);
    }

    #[test]
    fn test_annual_charges() {
        let mut ledger = Ledger::default();
        ledger.annual_charges.push(AnnualCharge {
            id: "a1".to_string(),
            label: "Expert-comptable".to_string(),
            amount_ht: 1500.0,
            year: 2025,
            document_url: None,
        });
        ledger.annual_charges.push(AnnualCharge {
            id: "a2".to_string(),
            label: "Assurance".to_string(),
            amount_ht: 400.0,
            year: 2024,
            document_url: None,
        });

        assert_eq!(annual_charges_total(&ledger, 2025), 1500.0);
        assert_eq!(monthly_amortization(1500.0), 125.0);
        assert_eq!(monthly_amortization(1000.0), 83.0);
    }

    #[test]
    fn test_expenses_grouped_by_month_and_category() {
        let mut ledger = Ledger::default();
        for (id, date, category) in [
            ("e1", "2025-03-01", Some(ExpenseCategory::Transport)),
            ("e2", "2025-03-15", None),
            ("e3", "2025-04-02", Some(ExpenseCategory::Transport)),
        ] {
            ledger.expenses.push(Expense {
                id: id.to_string(),
                date: date.to_string(),
                description: String::new(),
                amount_ht: 10.0,
                tva: 2.0,
                category,
                client_name: None,
                receipt_url: None,
            });
        }

        let months = expenses_by_month(&ledger);
        let march = &months["2025-03"];
        assert_eq!(march.total_ht, 20.0);
        assert_eq!(march.total_ttc, 24.0);
        assert_eq!(march.by_category[&ExpenseCategory::Other].len(), 1);
        assert_eq!(march.by_category[&ExpenseCategory::Transport][0].id, "e1");
        assert_eq!(months["2025-04"].by_category.len(), 1);
    }
}
