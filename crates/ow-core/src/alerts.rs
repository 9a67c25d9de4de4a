//! One-shot budget threshold alerts.
//!
//! [`BudgetAlertStateMachine`] is the only writer of [`AlertState`]. Flags
//! only ever go from `false` to `true`; a budget top-up does not re-arm
//! them. A fresh session starts from a fresh machine.

use std::fmt;

use ow_api_types::BudgetSnapshot;
use serde::{Deserialize, Serialize};

pub const WARN75_RATIO: f64 = 0.75;
pub const WARN90_RATIO: f64 = 0.90;

// ---------------------------------------------------------------------------
// AlertLevel
// ---------------------------------------------------------------------------

/// Alert levels in strictly increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    None,
    Warn75,
    Warn90,
    Exhausted,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Warn75 => "warn75",
            AlertLevel::Warn90 => "warn90",
            AlertLevel::Exhausted => "exhausted",
        }
    }

    /// Threshold a budget snapshot sits at, with no session history.
    ///
    /// Exhaustion only looks at `budget_left`, so it is detected even when
    /// the total is missing or zero. The warning levels need a usable
    /// ratio. A NaN `budget_left` classifies as `None`.
    pub fn for_budget(budget: &BudgetSnapshot) -> Self {
        if budget.budget_left.is_nan() {
            return AlertLevel::None;
        }
        if budget.budget_left <= 0.0 {
            return AlertLevel::Exhausted;
        }
        match budget.used_ratio() {
            Some(ratio) if ratio >= WARN90_RATIO => AlertLevel::Warn90,
            Some(ratio) if ratio >= WARN75_RATIO => AlertLevel::Warn75,
            _ => AlertLevel::None,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertState
// ---------------------------------------------------------------------------

/// Session-scoped record of which thresholds have already fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub warn75: bool,
    pub warn90: bool,
    pub exhausted: bool,
}

impl AlertState {
    /// Highest level that has fired so far.
    pub fn level(&self) -> AlertLevel {
        if self.exhausted {
            AlertLevel::Exhausted
        } else if self.warn90 {
            AlertLevel::Warn90
        } else if self.warn75 {
            AlertLevel::Warn75
        } else {
            AlertLevel::None
        }
    }
}

/// Notification emitted on a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetAlert {
    pub level: AlertLevel,
    pub budget_left: f64,
    pub budget_total: f64,
    /// Fraction of the budget used; `None` when the total is not positive.
    pub used_ratio: Option<f64>,
}

impl BudgetAlert {
    pub fn message(&self) -> String {
        match self.level {
            AlertLevel::Exhausted => format!(
                "Budget exhausted: {:.2} of {:.2} left",
                self.budget_left, self.budget_total
            ),
            level => format!(
                "Budget {:.0}% used ({:.2} of {:.2} left, threshold {})",
                self.used_ratio.unwrap_or(0.0) * 100.0,
                self.budget_left,
                self.budget_total,
                level
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// BudgetAlertStateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BudgetAlertStateMachine {
    state: AlertState,
}

impl BudgetAlertStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Feed one budget observation; returns the alert to surface, if any.
    ///
    /// Rules, first match wins:
    /// 1. `budget_left <= 0` and not yet exhausted → EXHAUSTED (sets all flags)
    /// 2. used ratio ≥ 0.90 and not yet warn90 → WARN90 (sets warn90, warn75)
    /// 3. used ratio ≥ 0.75 and not yet warn75 → WARN75
    ///
    /// Rules 2 and 3 need a positive, finite total; rule 1 does not.
    pub fn update(&mut self, budget: &BudgetSnapshot) -> Option<BudgetAlert> {
        let level = AlertLevel::for_budget(budget);
        // Flags are cumulative, so "not yet fired" is "above the fired level".
        if level <= self.state.level() {
            return None;
        }

        let s = &mut self.state;
        match level {
            AlertLevel::Exhausted => {
                s.exhausted = true;
                s.warn90 = true;
                s.warn75 = true;
            }
            AlertLevel::Warn90 => {
                s.warn90 = true;
                s.warn75 = true;
            }
            AlertLevel::Warn75 => s.warn75 = true,
            AlertLevel::None => return None,
        }

        tracing::info!(
            level = %level,
            budget_left = budget.budget_left,
            budget_total = budget.budget_total,
            "budget threshold crossed"
        );

        Some(BudgetAlert {
            level,
            budget_left: budget.budget_left,
            budget_total: budget.budget_total,
            used_ratio: budget.used_ratio(),
        })
    }
}
