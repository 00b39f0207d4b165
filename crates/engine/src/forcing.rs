//! The module contains the forcing rule and its resolver.
//!
//! Forcing replaces the true arithmetic result of an addition or subtraction
//! with a pre-configured value. Multiplication, division and remainder always
//! show the actual result; this is a fixed rule, not configurable.

use serde::{Deserialize, Serialize};

use crate::calculator::Operator;

/// User-configured forcing preferences.
///
/// All three fields are independently nullable. "No forcing" is the state
/// where `forced_number` and `second_force_trigger_number` are both `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcingRule {
    /// Value shown for any `+`/`-` result when no trigger matches.
    pub forced_number: Option<f64>,
    /// Value shown when the trigger condition matches.
    pub second_force_number: Option<f64>,
    /// If either operand of a `+`/`-` operation equals this value,
    /// `second_force_number` takes precedence over `forced_number`.
    pub second_force_trigger_number: Option<f64>,
}

impl ForcingRule {
    pub fn is_empty(&self) -> bool {
        self.forced_number.is_none() && self.second_force_trigger_number.is_none()
    }

    /// Builds a rule from free-form settings input.
    ///
    /// Empty or non-numeric input clears the corresponding field; "cleared"
    /// is indistinguishable from "never set".
    pub fn from_form_fields(forced: &str, second: &str, trigger: &str) -> Self {
        fn parse(field: &str) -> Option<f64> {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse().ok().filter(|v: &f64| v.is_finite())
        }

        Self {
            forced_number: parse(forced),
            second_force_number: parse(second),
            second_force_trigger_number: parse(trigger),
        }
    }
}

/// Result of a forcing resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForcingOutcome {
    /// The value actually shown and recorded.
    pub final_result: f64,
    /// The overriding value, when forcing applied.
    pub forced_result: Option<f64>,
    pub forced: bool,
}

impl ForcingOutcome {
    pub fn unforced(actual: f64) -> Self {
        Self {
            final_result: actual,
            forced_result: None,
            forced: false,
        }
    }

    pub fn forced(value: f64) -> Self {
        Self {
            final_result: value,
            forced_result: Some(value),
            forced: true,
        }
    }
}

/// Decides whether the displayed result of a calculation is overridden.
///
/// Precedence: a trigger match (exact float equality on either operand)
/// selects `second_force_number`; otherwise `forced_number` applies when set.
/// A trigger match whose `second_force_number` was never configured falls
/// through to `forced_number`, then to the actual result, so a calculation
/// can never resolve to a missing value.
pub fn resolve_forcing(
    operator: Operator,
    left: f64,
    right: f64,
    actual: f64,
    rule: &ForcingRule,
) -> ForcingOutcome {
    if !matches!(operator, Operator::Add | Operator::Subtract) {
        return ForcingOutcome::unforced(actual);
    }

    if let Some(trigger) = rule.second_force_trigger_number
        && (left == trigger || right == trigger)
        && let Some(second) = rule.second_force_number
    {
        return ForcingOutcome::forced(second);
    }

    match rule.forced_number {
        Some(value) => ForcingOutcome::forced(value),
        None => ForcingOutcome::unforced(actual),
    }
}
