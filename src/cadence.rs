use crate::schema::{Cadence, Occurrence, RecurringRule};
use crate::utils::{clamped_date, months_in_period};
use chrono::{Datelike, Days, NaiveDate};
use log::debug;

/// Reference week for fortnightly rules without a start date (a Sunday).
const FORTNIGHT_EPOCH: (i32, u32, u32) = (1970, 1, 4);

pub struct CadenceExpander<'a> {
    rule: &'a RecurringRule,
}

impl<'a> CadenceExpander<'a> {
    pub fn new(rule: &'a RecurringRule) -> Self {
        Self { rule }
    }

    /// Occurrences of the rule inside `[window_start, window_end]`, ascending.
    ///
    /// Anchoring depends only on the rule, never on the window, so a wider window
    /// always yields a superset of a narrower one.
    pub fn expand(&self, window_start: NaiveDate, window_end: NaiveDate) -> Vec<Occurrence> {
        if self.rule.amount_cents <= 0 {
            debug!(
                "Rule {} has non-positive amount {}; no occurrences",
                self.rule.id, self.rule.amount_cents
            );
            return Vec::new();
        }

        let start = match self.rule.start_date {
            Some(rule_start) => window_start.max(rule_start),
            None => window_start,
        };
        let end = match self.rule.end_date {
            Some(rule_end) => window_end.min(rule_end),
            None => window_end,
        };
        if end < start {
            return Vec::new();
        }

        let dates = match self.rule.cadence {
            Cadence::Weekly => self.weekly_dates(start, end, 1),
            Cadence::Fortnightly => self.weekly_dates(start, end, 2),
            Cadence::Monthly => self.monthly_dates(start, end, |_| true),
            Cadence::Quarterly => {
                let month_of_quarter = self.month_of_quarter();
                self.monthly_dates(start, end, |month| (month - 1) % 3 == month_of_quarter)
            }
            Cadence::Yearly => {
                let month_of_year = self.month_of_year();
                self.monthly_dates(start, end, |month| month - 1 == month_of_year)
            }
        };

        dates
            .into_iter()
            .map(|date| Occurrence {
                date,
                amount_cents: self.rule.amount_cents,
                source_rule_id: self.rule.id.clone(),
                kind: self.rule.kind,
            })
            .collect()
    }

    /// 0 = Sunday. Out-of-range values clamp to Saturday; a missing day falls back to
    /// the start date's weekday.
    fn day_of_week(&self) -> Option<u32> {
        self.rule
            .day_of_week
            .map(|day| day.min(6))
            .or_else(|| {
                self.rule
                    .start_date
                    .map(|d| d.weekday().num_days_from_sunday())
            })
    }

    fn day_of_month(&self) -> u32 {
        self.rule
            .day_of_month
            .or_else(|| self.rule.start_date.map(|d| d.day()))
            .unwrap_or(1)
            .clamp(1, 31)
    }

    fn month_of_quarter(&self) -> u32 {
        self.rule
            .month_of_quarter
            .or_else(|| self.rule.start_date.map(|d| d.month0() % 3))
            .unwrap_or(0)
            .min(2)
    }

    fn month_of_year(&self) -> u32 {
        self.rule
            .month_of_year
            .or_else(|| self.rule.start_date.map(|d| d.month0()))
            .unwrap_or(0)
            .min(11)
    }

    fn weekly_dates(&self, start: NaiveDate, end: NaiveDate, every_weeks: u64) -> Vec<NaiveDate> {
        let Some(target) = self.day_of_week() else {
            debug!("Rule {} has no day of week; no occurrences", self.rule.id);
            return Vec::new();
        };

        let offset = (target + 7 - start.weekday().num_days_from_sunday()) % 7;
        let Some(mut current) = start.checked_add_days(Days::new(offset as u64)) else {
            return Vec::new();
        };

        if every_weeks == 2 && !self.on_fortnight_parity(current) {
            current = match current.checked_add_days(Days::new(7)) {
                Some(next) => next,
                None => return Vec::new(),
            };
        }

        let step = Days::new(7 * every_weeks);
        let mut dates = Vec::new();
        while current <= end {
            dates.push(current);
            current = match current.checked_add_days(step) {
                Some(next) => next,
                None => break,
            };
        }
        dates
    }

    /// Whether `date` lies an even number of (Sunday-based) weeks after the rule's
    /// reference week.
    fn on_fortnight_parity(&self, date: NaiveDate) -> bool {
        let (y, m, d) = FORTNIGHT_EPOCH;
        let reference = self
            .rule
            .start_date
            .or_else(|| NaiveDate::from_ymd_opt(y, m, d))
            .unwrap_or(date);

        let week_start = |day: NaiveDate| {
            day - chrono::Duration::days(day.weekday().num_days_from_sunday() as i64)
        };
        let weeks = (week_start(date) - week_start(reference)).num_days() / 7;
        weeks.rem_euclid(2) == 0
    }

    fn monthly_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        month_filter: impl Fn(u32) -> bool,
    ) -> Vec<NaiveDate> {
        let day = self.day_of_month();

        months_in_period(start, end)
            .into_iter()
            .filter(|&(_, month)| month_filter(month))
            .filter_map(|(year, month)| clamped_date(year, month, day))
            .filter(|date| *date >= start && *date <= end)
            .collect()
    }
}

pub fn expand(
    rule: &RecurringRule,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Occurrence> {
    CadenceExpander::new(rule).expand(window_start, window_end)
}

/// Expands every rule and merges the result by date. Same-day occurrences keep the
/// order of `rules`.
pub fn expand_all(
    rules: &[RecurringRule],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Occurrence> {
    let mut occurrences: Vec<Occurrence> = rules
        .iter()
        .flat_map(|rule| expand(rule, window_start, window_end))
        .collect();
    occurrences.sort_by_key(|o| o.date);
    occurrences
}
