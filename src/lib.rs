//! # Budget Projection Engine
//!
//! Deterministic algorithms that turn sparse budgeting input (recurring rules, balance
//! snapshots, interest-rate schedules, bank CSV exports) into dense series: forecast
//! occurrences, daily and monthly balances, and deduplicated imports.
//!
//! ## Core Concepts
//!
//! - **Cadence**: how often a recurring rule repeats (weekly through yearly)
//! - **Occurrence**: one dated instance produced by expanding a rule over a window
//! - **Anchor**: a trusted balance on a date; ledger entries are replayed from the
//!   latest anchor instead of from the start of the account
//! - **Effective rate**: the interest rate in force on a date after applying a goal's
//!   rate schedule over its base rate
//! - **Fingerprint**: a stable key that identifies an imported bank transaction
//!
//! Every function is pure over in-memory data. Persistence, UI and network concerns
//! belong to the caller.
//!
//! ## Example
//!
//! ```rust,ignore
//! use budget_projection_engine::*;
//! use chrono::NaiveDate;
//!
//! let engine = BudgetEngine::new(EngineConfig::default())?;
//! let rent = RecurringRule {
//!     id: "rent".to_string(),
//!     description: "Rent".to_string(),
//!     kind: RuleType::Expense,
//!     amount_cents: 180_000,
//!     cadence: Cadence::Monthly,
//!     day_of_week: None,
//!     day_of_month: Some(31),
//!     month_of_quarter: None,
//!     month_of_year: None,
//!     category_id: None,
//!     savings_goal_id: None,
//!     start_date: None,
//!     end_date: None,
//! };
//!
//! let occurrences = engine.expand_rule(
//!     &rent,
//!     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
//! );
//! assert_eq!(occurrences.len(), 12);
//! ```

pub mod anchors;
pub mod cadence;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod interest;
pub mod money;
pub mod projection;
pub mod schema;
pub mod similarity;
pub mod utils;

pub use anchors::{
    daily_balances, get_active_anchor, get_active_savings_anchor, monthly_balances,
    replay_balance, resolve_balance, resolve_goal_balance, sort_anchors_desc, Anchor,
    BalanceResolver, BalanceSeries,
};
pub use cadence::{expand, expand_all, CadenceExpander};
pub use config::EngineConfig;
pub use diagnostics::{DiagnosticEntry, DiagnosticLog};
pub use error::{BudgetEngineError, Result};
pub use import::{
    existing_fingerprints, filter_duplicates, fingerprint, merge_batches, parse_csv, run_import,
    sanitize_description, CategoryRule, CsvImporter, DuplicateSplit, ImportBatch, ImportMetadata,
    ImportPhase, ImportProgress, ImportSink, ImportSummary, MergedImport, ParsedTransaction,
    SkipCategory, SkippedRow,
};
pub use interest::{
    accrue_interest, calculate_compound_interest, calculate_interest_earned,
    estimate_goal_completion, estimate_goal_completion_with_schedule, get_effective_rate,
    GoalProjection,
};
pub use money::{format_cents, from_monthly_cents, parse_amount_to_cents, to_monthly_cents};
pub use projection::{
    forecast_by_month, monthly_budget_equivalents, project_daily_balances, project_from_ledger,
    MonthlyForecast,
};
pub use schema::*;
pub use similarity::{find_similar_forecast_rules, find_similar_transactions};
pub use utils::{format_iso_date, get_months_between, local_date};

use chrono::{NaiveDate, TimeZone};
use log::{debug, info, Level};
use std::collections::HashSet;

/// Outcome of [`BudgetEngine::import_csv`]: the parsed batch split against the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub unique: Vec<ParsedTransaction>,
    pub duplicates: Vec<ParsedTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub errors: Vec<String>,
}

/// Entry point holding the validated configuration and the owned diagnostics buffer.
pub struct BudgetEngine {
    config: EngineConfig,
    diagnostics: DiagnosticLog,
}

impl BudgetEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Budget engine ready (similarity window {} days, projection cap {} months)",
            config.similarity_window_days, config.goal_projection_month_cap
        );

        let diagnostics = DiagnosticLog::new(config.diagnostics_capacity);
        Ok(Self {
            config,
            diagnostics,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    pub fn expand_rule(
        &self,
        rule: &RecurringRule,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<Occurrence> {
        expand(rule, start, end)
    }

    /// Cash balance on `as_of` from the snapshot's anchors and ledger.
    pub fn balance_on(&self, snapshot: &BudgetSnapshot, as_of: NaiveDate) -> i64 {
        BalanceResolver::new(&snapshot.anchors, &snapshot.transactions).balance_on(as_of)
    }

    pub fn goal_balance_on(
        &self,
        snapshot: &BudgetSnapshot,
        goal_id: &str,
        as_of: NaiveDate,
    ) -> i64 {
        resolve_goal_balance(goal_id, &snapshot.savings_anchors, &snapshot.transactions, as_of)
    }

    /// Parses an export in the local timezone, then drops rows already in `ledger`.
    /// Skipped and failed rows are recorded in the diagnostics log.
    pub fn import_csv(&mut self, raw: &str, ledger: &[Transaction]) -> ImportOutcome {
        self.import_csv_in(raw, ledger, chrono::Local)
    }

    pub fn import_csv_in<Tz: TimeZone>(
        &mut self,
        raw: &str,
        ledger: &[Transaction],
        timezone: Tz,
    ) -> ImportOutcome {
        let importer = CsvImporter::new(timezone, &self.config.import_source_tag)
            .with_max_amount_cents(self.config.max_amount_cents);
        let batch = importer.parse(raw);

        for skipped in &batch.skipped {
            self.diagnostics.append(
                Level::Info,
                format!("Row {} skipped: {}", skipped.row, skipped.reason),
            );
        }
        for error in &batch.errors {
            self.diagnostics.append(Level::Warn, error.clone());
        }

        let existing: HashSet<String> = existing_fingerprints(ledger);
        let split = filter_duplicates(batch.transactions, &existing);
        debug!(
            "Import split: {} new, {} already in ledger",
            split.unique.len(),
            split.duplicates.len()
        );

        ImportOutcome {
            unique: split.unique,
            duplicates: split.duplicates,
            skipped: batch.skipped,
            errors: batch.errors,
        }
    }

    /// Similar transactions using the configured date window.
    pub fn find_similar_transactions<'a>(
        &self,
        description: &str,
        amount_cents: i64,
        date: NaiveDate,
        candidates: &'a [Transaction],
        exclude_id: Option<&str>,
    ) -> Vec<&'a Transaction> {
        similarity::find_similar_transactions_within(
            description,
            amount_cents,
            date,
            candidates,
            exclude_id,
            self.config.similarity_window_days,
        )
    }

    pub fn estimate_goal_completion(
        &self,
        goal: &SavingsGoal,
        start: NaiveDate,
        current_cents: i64,
        monthly_contribution_cents: i64,
    ) -> Option<GoalProjection> {
        estimate_goal_completion_with_schedule(
            goal,
            start,
            current_cents,
            monthly_contribution_cents,
            self.config.goal_projection_month_cap,
        )
    }

    /// Parses a user-entered amount against the configured ceiling.
    pub fn parse_amount(&self, text: &str) -> Result<i64> {
        parse_amount_to_cents(text, self.config.max_amount_cents)
    }
}
