use crate::error::{BudgetEngineError, Result};
use crate::interest::DEFAULT_PROJECTION_MONTH_CAP;
use crate::money::MAX_AMOUNT_CENTS;
use crate::similarity::DEFAULT_SIMILARITY_WINDOW_DAYS;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::BudgetEngine`]. Every field has a default, so `{}` is a valid
/// configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    #[schemars(description = "Days either side of a date that still count as similar")]
    pub similarity_window_days: i64,

    #[schemars(description = "Months simulated before a savings goal is declared unreachable")]
    pub goal_projection_month_cap: u32,

    #[schemars(description = "Largest amount, in cents, accepted from user input")]
    pub max_amount_cents: i64,

    #[schemars(description = "Tag mixed into import fingerprints to keep banks apart")]
    pub import_source_tag: String,

    #[schemars(description = "Number of diagnostics kept in memory")]
    pub diagnostics_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_window_days: DEFAULT_SIMILARITY_WINDOW_DAYS,
            goal_projection_month_cap: DEFAULT_PROJECTION_MONTH_CAP,
            max_amount_cents: MAX_AMOUNT_CENTS,
            import_source_tag: crate::import::DEFAULT_SOURCE_TAG.to_string(),
            diagnostics_capacity: 200,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BudgetEngineError::InvalidConfig {
                field: "document".to_string(),
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, details: String| -> Result<()> {
            Err(BudgetEngineError::InvalidConfig {
                field: field.to_string(),
                details,
            })
        };

        if self.similarity_window_days < 0 {
            return invalid(
                "similarityWindowDays",
                format!("must not be negative (got {})", self.similarity_window_days),
            );
        }
        if self.goal_projection_month_cap == 0 {
            return invalid("goalProjectionMonthCap", "must be at least 1".to_string());
        }
        if self.max_amount_cents <= 0 {
            return invalid(
                "maxAmountCents",
                format!("must be positive (got {})", self.max_amount_cents),
            );
        }
        if self.import_source_tag.trim().is_empty() {
            return invalid("importSourceTag", "must not be empty".to_string());
        }
        if self.diagnostics_capacity == 0 {
            return invalid("diagnosticsCapacity", "must be at least 1".to_string());
        }

        Ok(())
    }
}
