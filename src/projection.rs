use crate::anchors::{BalanceResolver, BalanceSeries};
use crate::cadence::expand_all;
use crate::money::to_monthly_cents;
use crate::schema::{RecurringRule, RuleType};
use crate::utils::{get_months_between, month_key};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Forecast totals for one month, split by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyForecast {
    pub income_cents: i64,
    pub expense_cents: i64,
    pub savings_cents: i64,
}

impl MonthlyForecast {
    fn add(&mut self, kind: RuleType, amount_cents: i64) {
        match kind {
            RuleType::Income => self.income_cents += amount_cents,
            RuleType::Expense => self.expense_cents += amount_cents,
            RuleType::Savings => self.savings_cents += amount_cents,
        }
    }

    /// Cash left after expenses and savings transfers.
    pub fn net_cents(&self) -> i64 {
        self.income_cents - self.expense_cents - self.savings_cents
    }
}

fn cash_effect(kind: RuleType, amount_cents: i64) -> i64 {
    match kind {
        RuleType::Income => amount_cents,
        RuleType::Expense | RuleType::Savings => -amount_cents,
    }
}

/// Occurrence totals per `YYYY-MM`. Every month touching the window is present, even
/// when nothing falls in it.
pub fn forecast_by_month(
    rules: &[RecurringRule],
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<String, MonthlyForecast> {
    let mut months: BTreeMap<String, MonthlyForecast> = get_months_between(start, end)
        .into_iter()
        .map(|key| (key, MonthlyForecast::default()))
        .collect();

    for occurrence in expand_all(rules, start, end) {
        months
            .entry(month_key(&occurrence.date))
            .or_default()
            .add(occurrence.kind, occurrence.amount_cents);
    }

    months
}

/// Smoothed monthly totals: each rule converted with fixed annualized divisors, so a
/// yearly bill shows as a twelfth every month.
pub fn monthly_budget_equivalents(rules: &[RecurringRule]) -> MonthlyForecast {
    let mut totals = MonthlyForecast::default();
    for rule in rules {
        totals.add(rule.kind, to_monthly_cents(rule.amount_cents, rule.cadence));
    }
    totals
}

/// Day-by-day cash balance starting from `opening_cents` at the beginning of `start`.
/// Each day's value includes that day's occurrences.
pub fn project_daily_balances(
    opening_cents: i64,
    rules: &[RecurringRule],
    start: NaiveDate,
    end: NaiveDate,
) -> BalanceSeries {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for occurrence in expand_all(rules, start, end) {
        *per_day.entry(occurrence.date).or_default() +=
            cash_effect(occurrence.kind, occurrence.amount_cents);
    }

    let mut balance = opening_cents;
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| {
            balance += per_day.get(&day).copied().unwrap_or(0);
            (day, balance)
        })
        .collect()
}

/// Resolved balance on `as_of`, then forecast forward through `end`. The series starts
/// at `as_of`; recorded ledger entries after `as_of` are not included.
pub fn project_from_ledger(
    resolver: &BalanceResolver<'_>,
    rules: &[RecurringRule],
    as_of: NaiveDate,
    end: NaiveDate,
) -> BalanceSeries {
    let opening = resolver.balance_on(as_of);

    let mut series = BalanceSeries::new();
    series.insert(as_of, opening);
    if let Some(next_day) = as_of.checked_add_days(Days::new(1)) {
        series.extend(project_daily_balances(opening, rules, next_day, end));
    }
    series
}
