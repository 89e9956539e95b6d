use crate::schema::{RecurringRule, Transaction};
use crate::utils::days_apart;
use chrono::NaiveDate;

/// Calendar days either side of a transaction's date that still count as "similar".
pub const DEFAULT_SIMILARITY_WINDOW_DAYS: i64 = 3;

/// Case-insensitive, ignoring leading and trailing whitespace.
fn same_description(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Existing transactions that look like the one being entered: same description
/// (case-insensitive, surrounding whitespace ignored), same absolute amount and dated
/// within three days.
///
/// An empty description or a zero amount never matches anything.
pub fn find_similar_transactions<'a>(
    description: &str,
    amount_cents: i64,
    date: NaiveDate,
    candidates: &'a [Transaction],
    exclude_id: Option<&str>,
) -> Vec<&'a Transaction> {
    find_similar_transactions_within(
        description,
        amount_cents,
        date,
        candidates,
        exclude_id,
        DEFAULT_SIMILARITY_WINDOW_DAYS,
    )
}

pub fn find_similar_transactions_within<'a>(
    description: &str,
    amount_cents: i64,
    date: NaiveDate,
    candidates: &'a [Transaction],
    exclude_id: Option<&str>,
    window_days: i64,
) -> Vec<&'a Transaction> {
    if description.trim().is_empty() || amount_cents == 0 {
        return Vec::new();
    }

    candidates
        .iter()
        .filter(|candidate| exclude_id != Some(candidate.id.as_str()))
        .filter(|candidate| candidate.amount_cents.unsigned_abs() == amount_cents.unsigned_abs())
        .filter(|candidate| days_apart(candidate.date, date) <= window_days)
        .filter(|candidate| same_description(&candidate.description, description))
        .collect()
}

/// Forecast rules with the same description and amount. Rules are undated, so there
/// is no date window.
pub fn find_similar_forecast_rules<'a>(
    description: &str,
    amount_cents: i64,
    rules: &'a [RecurringRule],
    exclude_id: Option<&str>,
) -> Vec<&'a RecurringRule> {
    if description.trim().is_empty() || amount_cents == 0 {
        return Vec::new();
    }

    rules
        .iter()
        .filter(|rule| exclude_id != Some(rule.id.as_str()))
        .filter(|rule| rule.amount_cents.unsigned_abs() == amount_cents.unsigned_abs())
        .filter(|rule| same_description(&rule.description, description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cadence, RuleType, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: &str, description: &str, amount_cents: i64, date: NaiveDate) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind: TransactionType::Expense,
            date,
            amount_cents,
            description: description.to_string(),
            category_id: None,
            savings_goal_id: None,
            payment_method: None,
            notes: None,
            import_fingerprint: None,
        }
    }

    fn forecast(id: &str, description: &str, amount_cents: i64) -> RecurringRule {
        RecurringRule {
            id: id.to_string(),
            description: description.to_string(),
            kind: RuleType::Expense,
            amount_cents,
            cadence: Cadence::Monthly,
            day_of_week: None,
            day_of_month: Some(1),
            month_of_quarter: None,
            month_of_year: None,
            category_id: None,
            savings_goal_id: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_sign_agnostic_match_within_three_days() {
        let candidates = vec![tx("a", "Groceries", -5000, date(2026, 1, 12))];
        let matches =
            find_similar_transactions("Groceries", 5000, date(2026, 1, 15), &candidates, None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
    }

    #[test]
    fn test_window_is_inclusive_and_bounded() {
        let candidates = vec![
            tx("edge-before", "groceries", 5000, date(2026, 1, 12)),
            tx("edge-after", "GROCERIES", 5000, date(2026, 1, 18)),
            tx("too-early", "Groceries", 5000, date(2026, 1, 11)),
            tx("too-late", "Groceries", 5000, date(2026, 1, 19)),
        ];
        let ids: Vec<&str> =
            find_similar_transactions("Groceries", 5000, date(2026, 1, 15), &candidates, None)
                .iter()
                .map(|t| t.id.as_str())
                .collect();
        assert_eq!(ids, vec!["edge-before", "edge-after"]);
    }

    #[test]
    fn test_description_ignores_case_and_surrounding_whitespace() {
        let on = date(2026, 1, 15);
        let candidates = vec![tx("a", " Coffee ", 450, on), tx("b", "Cof fee", 450, on)];
        let ids: Vec<&str> = find_similar_transactions("coffee", 450, on, &candidates, None)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_window_crosses_month_boundary() {
        let candidates = vec![tx("a", "Rent", 180_000, date(2026, 2, 27))];
        assert_eq!(
            find_similar_transactions("Rent", 180_000, date(2026, 3, 2), &candidates, None).len(),
            1
        );
    }

    #[test]
    fn test_excluded_id_and_mismatches() {
        let candidates = vec![
            tx("self", "Coffee", 450, date(2026, 1, 15)),
            tx("other-amount", "Coffee", 451, date(2026, 1, 15)),
            tx("other-name", "Coffee beans", 450, date(2026, 1, 15)),
        ];
        let on = date(2026, 1, 15);
        assert!(find_similar_transactions("Coffee", 450, on, &candidates, Some("self")).is_empty());
        assert_eq!(
            find_similar_transactions("Coffee", 450, date(2026, 1, 15), &candidates, None).len(),
            1
        );
    }

    #[test]
    fn test_guards_against_mass_matching() {
        let on = date(2026, 1, 15);
        let candidates = vec![tx("a", "", 0, on), tx("b", "", 100, on)];
        assert!(find_similar_transactions("", 100, on, &candidates, None).is_empty());
        assert!(find_similar_transactions("   ", 100, on, &candidates, None).is_empty());
        assert!(find_similar_transactions("x", 0, on, &candidates, None).is_empty());
    }

    #[test]
    fn test_custom_window() {
        let candidates = vec![tx("a", "Gym", 2000, date(2026, 1, 8))];
        let on = date(2026, 1, 15);
        assert!(find_similar_transactions("Gym", 2000, on, &candidates, None).is_empty());
        assert_eq!(
            find_similar_transactions_within("Gym", 2000, on, &candidates, None, 7).len(),
            1
        );
    }

    #[test]
    fn test_similar_forecast_rules_ignore_dates() {
        let rules = vec![
            forecast("netflix", "Netflix", 2299),
            forecast("spotify", "Spotify", 1299),
            forecast("netflix-dup", "netflix ", 2299),
        ];
        let ids: Vec<&str> = find_similar_forecast_rules("NETFLIX", -2299, &rules, Some("netflix"))
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["netflix-dup"]);
        assert!(find_similar_forecast_rules("Netflix", 0, &rules, None).is_empty());
    }
}
