use crate::error::Result;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[schemars(description = "Once every week on dayOfWeek")]
    Weekly,

    #[schemars(
        description = "Once every two weeks on dayOfWeek. Parity follows the rule's own startDate, not the viewed window."
    )]
    Fortnightly,

    #[schemars(description = "Once per calendar month on dayOfMonth (clamped to the month's last day)")]
    Monthly,

    #[schemars(description = "Once per calendar quarter, in the monthOfQuarter-th month, on dayOfMonth")]
    Quarterly,

    #[schemars(description = "Once per year in monthOfYear on dayOfMonth")]
    Yearly,
}

impl Cadence {
    pub const ALL: [Cadence; 5] = [
        Cadence::Weekly,
        Cadence::Fortnightly,
        Cadence::Monthly,
        Cadence::Quarterly,
        Cadence::Yearly,
    ];
}

/// Direction of a recurring rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Income,
    Expense,
    Savings,
}

impl From<RuleType> for TransactionType {
    fn from(kind: RuleType) -> Self {
        match kind {
            RuleType::Income => TransactionType::Income,
            RuleType::Expense => TransactionType::Expense,
            RuleType::Savings => TransactionType::Savings,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Savings,
    Transfer,
    #[schemars(description = "Positive corrective entry. Adds to the balance like income.")]
    Adjustment,
}

impl TransactionType {
    /// +1 for entries that add to a cash balance, -1 for everything else.
    pub fn balance_sign(self) -> i64 {
        match self {
            TransactionType::Income | TransactionType::Adjustment => 1,
            _ => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compounding {
    Yearly,
    #[default]
    Monthly,
    Daily,
}

impl Compounding {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Compounding::Yearly => 1.0,
            Compounding::Monthly => 12.0,
            Compounding::Daily => 365.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecurringRule {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: RuleType,

    #[schemars(description = "Amount per occurrence in cents. Always positive; the type carries the direction.")]
    pub amount_cents: i64,

    pub cadence: Cadence,

    #[serde(default)]
    #[schemars(description = "0 = Sunday .. 6 = Saturday. Used by weekly and fortnightly rules.")]
    pub day_of_week: Option<u32>,

    #[serde(default)]
    #[schemars(description = "1-31. Days past the end of a month fall on that month's last day.")]
    pub day_of_month: Option<u32>,

    #[serde(default)]
    #[schemars(description = "0-2. Which month of each quarter a quarterly rule lands in.")]
    pub month_of_quarter: Option<u32>,

    #[serde(default)]
    #[schemars(description = "0-11. Which month a yearly rule lands in (0 = January).")]
    pub month_of_year: Option<u32>,

    #[serde(default)]
    pub category_id: Option<String>,

    #[serde(default)]
    pub savings_goal_id: Option<String>,

    #[serde(default)]
    #[schemars(
        description = "First day the rule may occur. Also the reference week for fortnightly parity."
    )]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Last day (inclusive) the rule may occur.")]
    pub end_date: Option<NaiveDate>,
}

/// One dated instance of a recurring rule. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub source_rule_id: String,
    #[serde(rename = "type")]
    pub kind: RuleType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BalanceAnchor {
    pub date: NaiveDate,
    pub balance_cents: i64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavingsAnchor {
    pub savings_goal_id: String,
    pub date: NaiveDate,
    pub balance_cents: i64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RateChange {
    pub effective_date: NaiveDate,
    #[schemars(description = "Annual rate in percent, 0-100 (4.5 means 4.5%)")]
    pub annual_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavingsGoal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_cents: i64,
    #[serde(default)]
    #[schemars(description = "Base annual rate in percent, used before the first schedule entry")]
    pub annual_interest_rate: Option<f64>,
    #[serde(default)]
    pub interest_rate_schedule: Vec<RateChange>,
    #[serde(default)]
    pub compounding: Compounding,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub date: NaiveDate,
    #[schemars(
        description = "Cents. Non-negative for ordinary entries; savings withdrawals may be stored negative."
    )]
    pub amount_cents: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub savings_goal_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub import_fingerprint: Option<String>,
}

/// Everything the engine reads, as handed over by the persistence layer or a backup file.
///
/// Every struct in the document rejects unknown keys, so keys such as `__proto__`
/// or `constructor` fail deserialization instead of being stripped after the fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BudgetSnapshot {
    #[serde(default)]
    pub rules: Vec<RecurringRule>,
    #[serde(default)]
    pub anchors: Vec<BalanceAnchor>,
    #[serde(default)]
    pub savings_anchors: Vec<SavingsAnchor>,
    #[serde(default)]
    pub goals: Vec<SavingsGoal>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl BudgetSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BudgetSnapshot)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
