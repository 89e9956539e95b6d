use crate::schema::{BalanceAnchor, SavingsAnchor, Transaction, TransactionType};
use crate::utils::{last_day_of_month, month_key, months_in_period};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Dense day-by-day balances in cents.
pub type BalanceSeries = BTreeMap<NaiveDate, i64>;

/// A trusted point-in-time balance.
pub trait Anchor {
    fn date(&self) -> NaiveDate;
    fn balance_cents(&self) -> i64;
}

impl Anchor for BalanceAnchor {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn balance_cents(&self) -> i64 {
        self.balance_cents
    }
}

impl Anchor for SavingsAnchor {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn balance_cents(&self) -> i64 {
        self.balance_cents
    }
}

impl<A: Anchor> Anchor for &A {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn balance_cents(&self) -> i64 {
        (**self).balance_cents()
    }
}

/// Newest first. The sort is stable, so anchors sharing a date keep insertion order.
pub fn sort_anchors_desc<A: Anchor>(anchors: &mut [A]) {
    anchors.sort_by(|a, b| b.date().cmp(&a.date()));
}

/// First anchor dated on or before `as_of` in a newest-first list.
pub fn get_active_anchor<A: Anchor>(sorted_desc: &[A], as_of: NaiveDate) -> Option<&A> {
    sorted_desc.iter().find(|anchor| anchor.date() <= as_of)
}

/// Active anchor among those belonging to `goal_id` only. Input order does not matter.
pub fn get_active_savings_anchor<'a>(
    anchors: &'a [SavingsAnchor],
    goal_id: &str,
    as_of: NaiveDate,
) -> Option<&'a SavingsAnchor> {
    let mut scoped: Vec<&SavingsAnchor> = anchors
        .iter()
        .filter(|anchor| anchor.savings_goal_id == goal_id)
        .collect();
    sort_anchors_desc(&mut scoped);
    get_active_anchor(&scoped, as_of).copied()
}

fn after_anchor<A: Anchor>(anchor: Option<&A>, date: NaiveDate) -> bool {
    anchor.map_or(true, |a| date > a.date())
}

/// Anchor balance plus every ledger entry dated strictly after the anchor and on or
/// before `as_of`. Entries on the anchor's own date are already part of it. Income and
/// adjustments add; everything else subtracts. Without an anchor the replay starts at 0.
pub fn replay_balance<A: Anchor>(
    anchor: Option<&A>,
    ledger: &[Transaction],
    as_of: NaiveDate,
) -> i64 {
    let base = anchor.map_or(0, |a| a.balance_cents());

    let movement: i64 = ledger
        .iter()
        .filter(|entry| entry.date <= as_of && after_anchor(anchor, entry.date))
        .map(|entry| entry.amount_cents * entry.kind.balance_sign())
        .sum();

    base + movement
}

pub fn resolve_balance<A: Anchor>(
    sorted_desc: &[A],
    ledger: &[Transaction],
    as_of: NaiveDate,
) -> i64 {
    replay_balance(get_active_anchor(sorted_desc, as_of), ledger, as_of)
}

/// Balance of one savings goal: its own active anchor plus the signed amounts of that
/// goal's savings entries after the anchor. Withdrawals are stored negative.
pub fn resolve_goal_balance(
    goal_id: &str,
    savings_anchors: &[SavingsAnchor],
    ledger: &[Transaction],
    as_of: NaiveDate,
) -> i64 {
    let anchor = get_active_savings_anchor(savings_anchors, goal_id, as_of);
    let base = anchor.map_or(0, |a| a.balance_cents);

    let movement: i64 = ledger
        .iter()
        .filter(|entry| {
            entry.kind == TransactionType::Savings
                && entry.savings_goal_id.as_deref() == Some(goal_id)
                && entry.date <= as_of
                && after_anchor(anchor, entry.date)
        })
        .map(|entry| entry.amount_cents)
        .sum();

    base + movement
}

/// Resolves many dates against one anchor set and ledger.
///
/// Keeps a running total of signed ledger movement per date, so each lookup is a
/// pair of range queries instead of a ledger scan.
pub struct BalanceResolver<'a> {
    anchors: Vec<&'a BalanceAnchor>,
    cumulative: BTreeMap<NaiveDate, i64>,
}

impl<'a> BalanceResolver<'a> {
    pub fn new(anchors: &'a [BalanceAnchor], ledger: &[Transaction]) -> Self {
        let mut sorted: Vec<&BalanceAnchor> = anchors.iter().collect();
        sort_anchors_desc(&mut sorted);

        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for entry in ledger {
            *per_day.entry(entry.date).or_default() +=
                entry.amount_cents * entry.kind.balance_sign();
        }

        let mut running = 0;
        let cumulative = per_day
            .into_iter()
            .map(|(date, movement)| {
                running += movement;
                (date, running)
            })
            .collect();

        Self {
            anchors: sorted,
            cumulative,
        }
    }

    /// Total signed movement of entries dated on or before `date`.
    fn movement_through(&self, date: NaiveDate) -> i64 {
        self.cumulative
            .range(..=date)
            .next_back()
            .map_or(0, |(_, total)| *total)
    }

    pub fn active_anchor(&self, as_of: NaiveDate) -> Option<&'a BalanceAnchor> {
        get_active_anchor(&self.anchors, as_of).copied()
    }

    pub fn balance_on(&self, as_of: NaiveDate) -> i64 {
        match self.active_anchor(as_of) {
            Some(anchor) => {
                anchor.balance_cents + self.movement_through(as_of)
                    - self.movement_through(anchor.date)
            }
            None => self.movement_through(as_of),
        }
    }

    pub fn daily_balances(&self, start: NaiveDate, end: NaiveDate) -> BalanceSeries {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|day| (day, self.balance_on(day)))
            .collect()
    }

    /// Balance at each month's last day, or at `end` for the final partial month.
    pub fn monthly_balances(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<String, i64> {
        months_in_period(start, end)
            .into_iter()
            .filter_map(|(year, month)| last_day_of_month(year, month))
            .map(|month_end| {
                let as_of = month_end.min(end);
                (month_key(&as_of), self.balance_on(as_of))
            })
            .collect()
    }
}

pub fn daily_balances(
    anchors: &[BalanceAnchor],
    ledger: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> BalanceSeries {
    BalanceResolver::new(anchors, ledger).daily_balances(start, end)
}

pub fn monthly_balances(
    anchors: &[BalanceAnchor],
    ledger: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<String, i64> {
    BalanceResolver::new(anchors, ledger).monthly_balances(start, end)
}
