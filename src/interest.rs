use crate::money::round_cents;
use crate::schema::{Compounding, RateChange, SavingsGoal};
use crate::utils::add_months;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Month cap for completion estimates; past it there is no projection.
pub const DEFAULT_PROJECTION_MONTH_CAP: u32 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProjection {
    /// Months of contributions until the target is met (0 if already met).
    pub months: u32,
    pub final_balance_cents: i64,
    /// Set by schedule-aware estimates, which know their starting date.
    pub completion_date: Option<NaiveDate>,
}

/// Schedule entries by ascending effective date. Entries sharing a date keep list order.
fn sorted_schedule(goal: &SavingsGoal) -> Vec<&RateChange> {
    let mut schedule: Vec<&RateChange> = goal.interest_rate_schedule.iter().collect();
    schedule.sort_by_key(|change| change.effective_date);
    schedule
}

/// Annual rate in percent (4.5 = 4.5%) in force on `date`.
///
/// The last schedule entry dated on or before `date` wins; when two entries share a
/// date the later one in the list overrides the earlier one. Before the first entry
/// the goal's base rate applies, and without one the rate is 0.
pub fn get_effective_rate(goal: &SavingsGoal, date: NaiveDate) -> f64 {
    let mut effective = None;
    for change in sorted_schedule(goal) {
        if change.effective_date > date {
            break;
        }
        effective = Some(change.annual_rate);
    }

    effective.or(goal.annual_interest_rate).unwrap_or(0.0)
}

/// `P × (1 + r/n)^(n×t)` in cents. Non-positive rates or durations leave the
/// principal unchanged.
pub fn calculate_compound_interest(
    principal_cents: i64,
    annual_rate_percent: f64,
    compounding: Compounding,
    years: f64,
) -> i64 {
    if !(annual_rate_percent > 0.0) || !(years > 0.0) {
        return principal_cents;
    }

    let periods = compounding.periods_per_year();
    let growth = (1.0 + annual_rate_percent / 100.0 / periods).powf(periods * years);
    round_cents(principal_cents as f64 * growth)
}

pub fn calculate_interest_earned(
    principal_cents: i64,
    annual_rate_percent: f64,
    compounding: Compounding,
    years: f64,
) -> i64 {
    calculate_compound_interest(principal_cents, annual_rate_percent, compounding, years)
        - principal_cents
}

/// Compounds `principal_cents` from `from` to `to`, switching rate at every schedule
/// change in between. Each constant-rate segment counts days / 365 as its years.
pub fn accrue_interest(
    goal: &SavingsGoal,
    principal_cents: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> i64 {
    if to <= from {
        return principal_cents;
    }

    let mut boundaries: Vec<NaiveDate> = sorted_schedule(goal)
        .into_iter()
        .map(|change| change.effective_date)
        .filter(|date| *date > from && *date < to)
        .collect();
    boundaries.dedup();
    boundaries.push(to);

    let mut balance = principal_cents;
    let mut segment_start = from;
    for segment_end in boundaries {
        let rate = get_effective_rate(goal, segment_start);
        let years = (segment_end - segment_start).num_days() as f64 / 365.0;
        balance = calculate_compound_interest(balance, rate, goal.compounding, years);
        segment_start = segment_end;
    }

    balance
}

/// Month-by-month completion estimate: each month adds the contribution and then
/// `balance × rate / 100 / 12` of interest. `None` when the target is not reached
/// within `max_months`.
pub fn estimate_goal_completion(
    current_cents: i64,
    target_cents: i64,
    monthly_contribution_cents: i64,
    annual_rate_percent: f64,
    max_months: u32,
) -> Option<GoalProjection> {
    simulate_goal(current_cents, target_cents, monthly_contribution_cents, max_months, |_| {
        annual_rate_percent
    })
    .map(|(months, final_balance_cents)| GoalProjection {
        months,
        final_balance_cents,
        completion_date: None,
    })
}

/// Like [`estimate_goal_completion`], but month `i` uses the goal's effective rate on
/// `start + i months`, so scheduled rate changes take effect on time.
pub fn estimate_goal_completion_with_schedule(
    goal: &SavingsGoal,
    start: NaiveDate,
    current_cents: i64,
    monthly_contribution_cents: i64,
    max_months: u32,
) -> Option<GoalProjection> {
    let (months, final_balance_cents) = simulate_goal(
        current_cents,
        goal.target_cents,
        monthly_contribution_cents,
        max_months,
        |month| {
            add_months(start, month)
                .map(|date| get_effective_rate(goal, date))
                .unwrap_or(0.0)
        },
    )?;

    Some(GoalProjection {
        months,
        final_balance_cents,
        completion_date: add_months(start, months),
    })
}

fn simulate_goal(
    current_cents: i64,
    target_cents: i64,
    monthly_contribution_cents: i64,
    max_months: u32,
    rate_for_month: impl Fn(u32) -> f64,
) -> Option<(u32, i64)> {
    if current_cents >= target_cents {
        return Some((0, current_cents));
    }

    let target = target_cents as f64;
    let mut balance = current_cents as f64;

    for month in 1..=max_months {
        balance += monthly_contribution_cents as f64;
        let rate = rate_for_month(month);
        if rate > 0.0 {
            balance += balance * (rate / 100.0 / 12.0);
        }
        if balance >= target {
            return Some((month, round_cents(balance)));
        }
    }

    debug!(
        "Goal target {} not reached within {} months; no projection",
        target_cents, max_months
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(base: Option<f64>, schedule: Vec<(NaiveDate, f64)>) -> SavingsGoal {
        SavingsGoal {
            id: "goal-1".to_string(),
            name: "Emergency fund".to_string(),
            target_cents: 1_000_000,
            annual_interest_rate: base,
            interest_rate_schedule: schedule
                .into_iter()
                .map(|(effective_date, annual_rate)| RateChange {
                    effective_date,
                    annual_rate,
                })
                .collect(),
            compounding: Compounding::Monthly,
        }
    }

    #[test]
    fn test_effective_rate_follows_schedule() {
        let g = goal(Some(4.0), vec![(date(2026, 3, 1), 4.5), (date(2026, 7, 1), 5.0)]);

        assert_eq!(get_effective_rate(&g, date(2026, 1, 15)), 4.0);
        assert_eq!(get_effective_rate(&g, date(2026, 3, 1)), 4.5);
        assert_eq!(get_effective_rate(&g, date(2026, 6, 30)), 4.5);
        assert_eq!(get_effective_rate(&g, date(2026, 7, 1)), 5.0);
    }

    #[test]
    fn test_effective_rate_ignores_list_order() {
        let g = goal(None, vec![(date(2026, 7, 1), 5.0), (date(2026, 3, 1), 4.5)]);
        assert_eq!(get_effective_rate(&g, date(2026, 4, 1)), 4.5);
        assert_eq!(get_effective_rate(&g, date(2026, 8, 1)), 5.0);
    }

    #[test]
    fn test_effective_rate_falls_back_to_zero() {
        let g = goal(None, vec![(date(2026, 3, 1), 4.5)]);
        assert_eq!(get_effective_rate(&g, date(2026, 2, 28)), 0.0);
    }

    /// Two entries on one date: the later list entry currently wins. This pins the
    /// existing tie-break; it is not a settled product decision.
    #[test]
    fn test_same_date_entries_last_in_list_wins() {
        let g = goal(Some(1.0), vec![(date(2026, 3, 1), 4.5), (date(2026, 3, 1), 3.0)]);
        assert_eq!(get_effective_rate(&g, date(2026, 3, 1)), 3.0);

        let reversed = goal(Some(1.0), vec![(date(2026, 3, 1), 3.0), (date(2026, 3, 1), 4.5)]);
        assert_eq!(get_effective_rate(&reversed, date(2026, 3, 1)), 4.5);
    }

    #[test]
    fn test_compound_interest() {
        assert_eq!(calculate_compound_interest(100_000, 5.0, Compounding::Yearly, 1.0), 105_000);
        assert_eq!(calculate_compound_interest(100_000, 12.0, Compounding::Monthly, 1.0), 112_683);
        assert_eq!(calculate_compound_interest(100_000, 10.0, Compounding::Yearly, 0.5), 104_881);
        assert!(calculate_compound_interest(100_000, 5.0, Compounding::Daily, 1.0) > 105_000);
    }

    #[test]
    fn test_compound_interest_guards() {
        assert_eq!(calculate_compound_interest(100_000, 0.0, Compounding::Daily, 3.0), 100_000);
        assert_eq!(calculate_compound_interest(100_000, -2.0, Compounding::Monthly, 3.0), 100_000);
        assert_eq!(calculate_compound_interest(100_000, 5.0, Compounding::Monthly, 0.0), 100_000);
        assert_eq!(calculate_compound_interest(100_000, 5.0, Compounding::Monthly, -1.0), 100_000);
        assert_eq!(
            calculate_compound_interest(100_000, f64::NAN, Compounding::Monthly, 1.0),
            100_000
        );
    }

    #[test]
    fn test_interest_earned_identity() {
        for (p, r, c, y) in [
            (123_456, 4.25, Compounding::Monthly, 2.5),
            (1, 99.0, Compounding::Daily, 10.0),
            (50_000, 0.0, Compounding::Yearly, 1.0),
            (-10_000, 3.0, Compounding::Yearly, 1.0),
        ] {
            assert_eq!(
                calculate_interest_earned(p, r, c, y),
                calculate_compound_interest(p, r, c, y) - p
            );
        }
    }

    #[test]
    fn test_accrue_interest_switches_rate_at_schedule_change() {
        let mut g = goal(None, vec![(date(2026, 7, 1), 12.0)]);
        g.compounding = Compounding::Yearly;

        // Zero rate until July, then exactly 365 days at 12%.
        assert_eq!(accrue_interest(&g, 100_000, date(2026, 1, 1), date(2027, 7, 1)), 112_000);
        assert_eq!(accrue_interest(&g, 100_000, date(2026, 1, 1), date(2026, 7, 1)), 100_000);
        assert_eq!(accrue_interest(&g, 100_000, date(2026, 7, 1), date(2026, 1, 1)), 100_000);
    }

    #[test]
    fn test_goal_completion_without_interest() {
        let projection = estimate_goal_completion(0, 120_000, 10_000, 0.0, 600).unwrap();
        assert_eq!(projection.months, 12);
        assert_eq!(projection.final_balance_cents, 120_000);

        let already = estimate_goal_completion(150_000, 120_000, 0, 0.0, 600).unwrap();
        assert_eq!(already.months, 0);
    }

    #[test]
    fn test_goal_completion_interest_shortens_timeline() {
        let plain = estimate_goal_completion(0, 1_000_000, 10_000, 0.0, 600).unwrap();
        let with_interest = estimate_goal_completion(0, 1_000_000, 10_000, 6.0, 600).unwrap();
        assert_eq!(plain.months, 100);
        assert!(with_interest.months < plain.months);
    }

    #[test]
    fn test_goal_completion_gives_up_at_cap() {
        assert!(estimate_goal_completion(0, 1_000_000, 0, 0.0, 600).is_none());
        assert!(estimate_goal_completion(0, 100_000_000, 1, 0.0, 600).is_none());
    }

    #[test]
    fn test_goal_completion_with_schedule_reports_date() {
        let g = goal(Some(0.0), vec![]);
        let projection =
            estimate_goal_completion_with_schedule(&g, date(2026, 1, 31), 400_000, 100_000, 600)
                .unwrap();
        assert_eq!(projection.months, 6);
        assert_eq!(projection.completion_date, Some(date(2026, 7, 31)));

        let boosted = goal(Some(0.0), vec![(date(2026, 2, 1), 50.0)]);
        let start = date(2026, 1, 31);
        let faster =
            estimate_goal_completion_with_schedule(&boosted, start, 400_000, 100_000, 600).unwrap();
        assert!(faster.months < projection.months);
    }
}
