use crate::error::Result;
use crate::money::{format_cents, parse_amount_to_cents, MAX_AMOUNT_CENTS};
use crate::schema::{Transaction, TransactionType};
use crate::utils::parse_iso_date;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

pub const DEFAULT_SOURCE_TAG: &str = "up";

/// Leading characters a spreadsheet would evaluate as a formula.
const FORMULA_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M %z",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    /// 1-based data row in the file (the header is not counted).
    pub row: usize,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub date: NaiveDate,
    /// Absolute amount; `kind` carries the direction.
    pub amount_cents: i64,
    pub description: String,
    pub payee: String,
    pub bank_category: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub import_fingerprint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCategory {
    ZeroAmount,
    UnparseableDate,
    InternalTransfer,
    RoundUp,
    LinkedAccount,
}

impl fmt::Display for SkipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipCategory::ZeroAmount => "zero amount",
            SkipCategory::UnparseableDate => "could not parse date",
            SkipCategory::InternalTransfer => "internal transfer",
            SkipCategory::RoundUp => "round up",
            SkipCategory::LinkedAccount => "linked account transfer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row: usize,
    pub category: SkipCategory,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub transactions: Vec<ParsedTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub errors: Vec<String>,
}

/// Prefixes `'` to text a spreadsheet would otherwise treat as a formula.
pub fn sanitize_description(text: &str) -> String {
    match text.chars().next() {
        Some(first) if FORMULA_TRIGGERS.contains(&first) => format!("'{}", text),
        _ => text.to_string(),
    }
}

/// Stable dedup key: source tag, date, absolute amount and lower-cased description.
pub fn fingerprint(
    description: &str,
    date: NaiveDate,
    amount_cents: i64,
    source_tag: &str,
) -> String {
    format!(
        "{}|{}|{}|{}",
        source_tag,
        date.format("%Y-%m-%d"),
        amount_cents.unsigned_abs(),
        description.trim().to_lowercase()
    )
}

/// Header positions, looked up case-insensitively.
#[derive(Debug, Default)]
struct ColumnMap {
    time: Option<usize>,
    transaction_type: Option<usize>,
    payee: Option<usize>,
    description: Option<usize>,
    category: Option<usize>,
    subtotal: Option<usize>,
    round_up: Option<usize>,
    total: Option<usize>,
    payment_method: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };

        Self {
            time: find("Time"),
            transaction_type: find("Transaction Type"),
            payee: find("Payee"),
            description: find("Description"),
            category: find("Category"),
            subtotal: find("Subtotal"),
            round_up: find("Round Up"),
            total: find("Total"),
            payment_method: find("Payment Method"),
        }
    }

    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.time.is_none() {
            missing.push("Time");
        }
        if self.subtotal.is_none() && self.total.is_none() {
            missing.push("Subtotal or Total");
        }
        if self.description.is_none() && self.payee.is_none() {
            missing.push("Description or Payee");
        }
        missing
    }
}

fn field<'r>(record: &'r StringRecord, column: Option<usize>) -> &'r str {
    column.and_then(|idx| record.get(idx)).unwrap_or("").trim()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parses exports into [`ImportBatch`]es, converting timestamps into calendar dates in
/// `timezone`.
///
/// The expected layout is the Up bank export (`Time`, `Account Name`, `Transaction Type`,
/// `Payee`, `Description`, `Category`, `Subtotal`, `Round Up`, `Total`,
/// `Payment Method`, `Settled Date`). Columns are located by header name, so order and
/// extra columns do not matter. A bad row never aborts the import: it lands in
/// `skipped` or `errors` with a readable reason.
pub struct CsvImporter<Tz: TimeZone> {
    timezone: Tz,
    source_tag: String,
    max_amount_cents: i64,
}

impl CsvImporter<Local> {
    /// Importer that reads dates in the machine's local timezone.
    pub fn local() -> Self {
        Self::new(Local, DEFAULT_SOURCE_TAG)
    }
}

impl<Tz: TimeZone> CsvImporter<Tz> {
    pub fn new(timezone: Tz, source_tag: &str) -> Self {
        Self {
            timezone,
            source_tag: source_tag.to_string(),
            max_amount_cents: MAX_AMOUNT_CENTS,
        }
    }

    pub fn with_max_amount_cents(mut self, max_amount_cents: i64) -> Self {
        self.max_amount_cents = max_amount_cents;
        self
    }

    pub fn parse(&self, raw: &str) -> ImportBatch {
        let mut batch = ImportBatch::default();
        let raw = raw.trim_start_matches('\u{feff}');

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw.as_bytes());

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                batch.errors.push(format!("Could not read CSV header: {}", e));
                return batch;
            }
        };

        let columns = ColumnMap::from_headers(&headers);
        let missing = columns.missing_required();
        if !missing.is_empty() {
            let message = format!("Missing required column(s): {}", missing.join(", "));
            warn!("{}", message);
            batch.errors.push(message);
            return batch;
        }

        for (idx, result) in reader.records().enumerate() {
            let row = idx + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    batch.errors.push(format!("Row {}: could not read record: {}", row, e));
                    continue;
                }
            };

            if record.iter().all(|value| value.trim().is_empty()) {
                continue;
            }

            match self.classify_record(&record, row, &columns) {
                Ok(RowOutcome::Parsed(transaction)) => batch.transactions.push(*transaction),
                Ok(RowOutcome::Skipped(skipped)) => {
                    debug!("Row {} skipped: {}", skipped.row, skipped.reason);
                    batch.skipped.push(skipped);
                }
                Err(message) => {
                    warn!("{}", message);
                    batch.errors.push(message);
                }
            }
        }

        info!(
            "Parsed CSV import: {} transactions, {} skipped, {} errors",
            batch.transactions.len(),
            batch.skipped.len(),
            batch.errors.len()
        );

        batch
    }

    fn classify_record(
        &self,
        record: &StringRecord,
        row: usize,
        columns: &ColumnMap,
    ) -> RowResult {
        let skip = |category: SkipCategory, reason: String| -> RowResult {
            Ok(RowOutcome::Skipped(SkippedRow {
                row,
                category,
                reason,
            }))
        };

        let subtotal = field(record, columns.subtotal);
        let amount_text = if subtotal.is_empty() {
            field(record, columns.total)
        } else {
            subtotal
        };
        if amount_text.is_empty() {
            return Err(format!("Row {}: missing amount", row));
        }
        let signed_cents = parse_amount_to_cents(amount_text, self.max_amount_cents)
            .map_err(|e| format!("Row {}: {}", row, e))?;

        if signed_cents == 0 {
            return skip(SkipCategory::ZeroAmount, SkipCategory::ZeroAmount.to_string());
        }

        let time_text = field(record, columns.time);
        let Some(date) = self.parse_date(time_text) else {
            return skip(
                SkipCategory::UnparseableDate,
                format!("{}: '{}'", SkipCategory::UnparseableDate, time_text),
            );
        };

        let transaction_type = field(record, columns.transaction_type);
        let payee = field(record, columns.payee);
        if let Some(category) = transfer_category(transaction_type, payee) {
            let label = match category {
                SkipCategory::LinkedAccount => payee,
                _ => transaction_type,
            };
            return skip(category, format!("{} ({})", category, label));
        }

        let kind = if signed_cents > 0 {
            TransactionType::Income
        } else {
            TransactionType::Expense
        };
        let amount_cents = signed_cents.abs();

        let description_text = field(record, columns.description);
        let description = sanitize_description(if description_text.is_empty() {
            payee
        } else {
            description_text
        });

        let round_up_text = field(record, columns.round_up);
        let notes = match parse_amount_to_cents(round_up_text, self.max_amount_cents) {
            Ok(round_up) if round_up != 0 => Some(format!("Round up: {}", format_cents(round_up))),
            _ => None,
        };

        Ok(RowOutcome::Parsed(Box::new(ParsedTransaction {
            row,
            kind,
            date,
            amount_cents,
            import_fingerprint: fingerprint(&description, date, amount_cents, &self.source_tag),
            description,
            payee: sanitize_description(payee),
            bank_category: non_empty(field(record, columns.category))
                .map(|c| sanitize_description(&c)),
            payment_method: non_empty(field(record, columns.payment_method)),
            notes,
        })))
    }

    /// Calendar date of an offset-carrying timestamp, as seen in the importer's timezone.
    /// Bare `YYYY-MM-DD` values are taken as already local.
    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        if text.is_empty() {
            return None;
        }

        let timestamp = DateTime::parse_from_rfc3339(text).ok().or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|format| DateTime::<FixedOffset>::parse_from_str(text, format).ok())
        });

        match timestamp {
            Some(ts) => Some(ts.with_timezone(&self.timezone).date_naive()),
            None => parse_iso_date(text).ok(),
        }
    }
}

enum RowOutcome {
    Parsed(Box<ParsedTransaction>),
    Skipped(SkippedRow),
}

/// `Err` carries a row-level message destined for [`ImportBatch::errors`].
type RowResult = std::result::Result<RowOutcome, String>;

/// Rows that move money between the user's own accounts, which would otherwise be
/// counted twice.
fn transfer_category(transaction_type: &str, payee: &str) -> Option<SkipCategory> {
    let transaction_type = transaction_type.to_lowercase();
    let payee = payee.to_lowercase();

    if transaction_type == "round up" {
        Some(SkipCategory::RoundUp)
    } else if transaction_type.contains("transfer") {
        Some(SkipCategory::InternalTransfer)
    } else if payee == "2up" || payee.starts_with("2up ") {
        Some(SkipCategory::LinkedAccount)
    } else {
        None
    }
}

/// Parses an export using the local timezone and the default source tag.
pub fn parse_csv(raw: &str) -> ImportBatch {
    CsvImporter::local().parse(raw)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateSplit {
    pub unique: Vec<ParsedTransaction>,
    pub duplicates: Vec<ParsedTransaction>,
}

/// Partitions purely on fingerprint membership in `existing`.
pub fn filter_duplicates(
    transactions: Vec<ParsedTransaction>,
    existing: &HashSet<String>,
) -> DuplicateSplit {
    let (duplicates, unique) = transactions
        .into_iter()
        .partition(|t| existing.contains(&t.import_fingerprint));
    DuplicateSplit { unique, duplicates }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedImport {
    pub unique: Vec<ParsedTransaction>,
    /// Already present in the ledger.
    pub duplicates: Vec<ParsedTransaction>,
    /// Seen earlier in one of the merged batches.
    pub cross_batch_duplicates: Vec<ParsedTransaction>,
}

/// Merges several parsed files, dropping rows already in the ledger and rows repeated
/// across (or within) the batches. The first copy of a repeated row wins.
pub fn merge_batches(
    batches: Vec<Vec<ParsedTransaction>>,
    existing: &HashSet<String>,
) -> MergedImport {
    let mut merged = MergedImport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for transaction in batches.into_iter().flatten() {
        if existing.contains(&transaction.import_fingerprint) {
            merged.duplicates.push(transaction);
        } else if !seen.insert(transaction.import_fingerprint.clone()) {
            merged.cross_batch_duplicates.push(transaction);
        } else {
            merged.unique.push(transaction);
        }
    }

    merged
}

/// Fingerprints of ledger entries that came from an import.
pub fn existing_fingerprints(ledger: &[Transaction]) -> HashSet<String> {
    ledger
        .iter()
        .filter_map(|t| t.import_fingerprint.clone())
        .collect()
}

/// Assigns `category_id` to imported rows whose description contains `pattern`
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryRule {
    pub pattern: String,
    pub category_id: String,
}

impl CategoryRule {
    fn matches(&self, description: &str) -> bool {
        let pattern = self.pattern.trim().to_lowercase();
        !pattern.is_empty() && description.to_lowercase().contains(&pattern)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportPhase {
    Collect,
    Create,
    ApplyRules,
    Persist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub phase: ImportPhase,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportMetadata {
    pub bank_categories: BTreeSet<String>,
    pub payment_methods: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub metadata: ImportMetadata,
    pub created: usize,
    pub categorized: usize,
    pub persisted: usize,
}

/// Storage collaborator that receives the finished ledger entries.
pub trait ImportSink {
    fn persist(&mut self, transactions: &[Transaction]) -> Result<()>;
}

/// Commits deduplicated candidates in explicit phases:
/// collect metadata, create ledger entries, apply category rules, persist.
///
/// `on_progress` fires when each phase starts and when it finishes, giving the caller
/// a natural point to yield to its own event loop.
pub fn run_import<S: ImportSink>(
    candidates: &[ParsedTransaction],
    rules: &[CategoryRule],
    sink: &mut S,
    mut on_progress: impl FnMut(ImportProgress),
) -> Result<ImportSummary> {
    let total = candidates.len();
    let mut report = |phase: ImportPhase, completed: usize| {
        on_progress(ImportProgress {
            phase,
            completed,
            total,
        })
    };
    let mut summary = ImportSummary::default();

    report(ImportPhase::Collect, 0);
    for candidate in candidates {
        if let Some(category) = &candidate.bank_category {
            summary.metadata.bank_categories.insert(category.clone());
        }
        if let Some(method) = &candidate.payment_method {
            summary.metadata.payment_methods.insert(method.clone());
        }
    }
    report(ImportPhase::Collect, total);

    report(ImportPhase::Create, 0);
    let mut created: Vec<Transaction> = candidates
        .iter()
        .map(|candidate| Transaction {
            id: candidate.import_fingerprint.clone(),
            kind: candidate.kind,
            date: candidate.date,
            amount_cents: candidate.amount_cents,
            description: candidate.description.clone(),
            category_id: None,
            savings_goal_id: None,
            payment_method: candidate.payment_method.clone(),
            notes: candidate.notes.clone(),
            import_fingerprint: Some(candidate.import_fingerprint.clone()),
        })
        .collect();
    summary.created = created.len();
    report(ImportPhase::Create, total);

    report(ImportPhase::ApplyRules, 0);
    for transaction in &mut created {
        if let Some(rule) = rules.iter().find(|rule| rule.matches(&transaction.description)) {
            transaction.category_id = Some(rule.category_id.clone());
            summary.categorized += 1;
        }
    }
    report(ImportPhase::ApplyRules, total);

    report(ImportPhase::Persist, 0);
    sink.persist(&created)?;
    summary.persisted = created.len();
    report(ImportPhase::Persist, total);

    info!(
        "Import committed: {} created, {} categorized",
        summary.created, summary.categorized
    );

    Ok(summary)
}
