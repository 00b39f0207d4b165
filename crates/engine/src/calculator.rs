//! The module contains the calculator state machine.
//!
//! The machine accumulates keystrokes into a display buffer, applies the
//! pending operator on `=` and routes the result through the forcing
//! resolver. Every operation is an infallible state transition; the only one
//! with an observable output is [`Calculator::press_equals`], which returns
//! the completed [`HistoryEntry`].

use serde::{Deserialize, Serialize};

use crate::forcing::{ForcingRule, resolve_forcing};
use crate::history::{HistoryEntry, OperationType};

/// Binary operators of the calculator keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Floating-point remainder, used when `%` acts as a binary operator.
    Remainder,
}

impl Operator {
    /// Returns the keypad symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Remainder => "%",
        }
    }

    /// Native IEEE-754 double evaluation of `left <op> right`.
    ///
    /// Division by zero yields `Infinity`/`NaN`; callers format these for
    /// display instead of special-casing them.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Subtract => left - right,
            Self::Multiply => left * right,
            Self::Divide => left / right,
            Self::Remainder => left % right,
        }
    }

    pub fn operation_type(self) -> OperationType {
        match self {
            Self::Add => OperationType::Addition,
            Self::Subtract => OperationType::Subtraction,
            Self::Multiply => OperationType::Multiplication,
            Self::Divide => OperationType::Division,
            Self::Remainder => OperationType::Mixed,
        }
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "×" | "*" | "x" => Ok(Self::Multiply),
            "÷" | "/" => Ok(Self::Divide),
            "%" => Ok(Self::Remainder),
            other => Err(format!("unknown operator: {other}")),
        }
    }
}

/// Whether a forcing rule survives the calculation that consumed it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForcingMode {
    /// The rule stays active until explicitly cleared.
    #[default]
    Persistent,
    /// The rule is cleared immediately after the first forced result.
    OneShot,
}

/// How the `%` key behaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PercentMode {
    /// Divide the displayed value by 100 in place.
    #[default]
    Unary,
    /// Treat `%` as a binary operator with the same operand machinery as
    /// `+`/`-`/`×`/`÷`.
    Binary,
}

/// Construction-time behaviour switches.
///
/// The original calculator grew several near-duplicate variants; these flags
/// consolidate the divergent semantics behind one engine, resolved once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalculatorConfig {
    pub forcing_mode: ForcingMode,
    pub percent_mode: PercentMode,
}

/// Session-scoped keypad state. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculatorState {
    /// Current entry buffer. Always parses as a float or is exactly `"0"`;
    /// `"Infinity"`/`"NaN"` appear only as rendered results.
    pub display: String,
    /// Left operand once an operator was chosen; `None` means no pending
    /// operation.
    pub previous_value: Option<f64>,
    pub pending_operator: Option<Operator>,
    /// True immediately after an operator or `=`; the next digit starts a
    /// fresh number instead of appending.
    pub awaiting_new_operand: bool,
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self {
            display: "0".to_string(),
            previous_value: None,
            pending_operator: None,
            awaiting_new_operand: false,
        }
    }
}

/// Formats a result for the display.
///
/// `Infinity` and `NaN` are rendered as literal strings rather than crashing
/// or rounding; everything else uses the shortest float representation.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

/// The calculator engine.
#[derive(Clone, Debug, Default)]
pub struct Calculator {
    state: CalculatorState,
    config: CalculatorConfig,
    rule: ForcingRule,
}

impl Calculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &CalculatorState {
        &self.state
    }

    pub fn display(&self) -> &str {
        &self.state.display
    }

    pub fn rule(&self) -> &ForcingRule {
        &self.rule
    }

    /// Replaces the active forcing rule (settings form, remote profile).
    pub fn set_rule(&mut self, rule: ForcingRule) {
        self.rule = rule;
    }

    /// Parsed value of the display buffer.
    ///
    /// The buffer is built exclusively from digit/decimal presses (plus the
    /// rendered `Infinity`/`NaN`, both of which `f64` parses), so a parse
    /// failure is unreachable; the fallback is `0`.
    fn current_value(&self) -> f64 {
        self.state.display.parse().unwrap_or(0.0)
    }

    pub fn press_digit(&mut self, digit: u8) {
        let digit = (digit % 10).to_string();
        if self.state.awaiting_new_operand {
            self.state.display = digit;
            self.state.awaiting_new_operand = false;
        } else if self.state.display == "0" {
            self.state.display = digit;
        } else {
            self.state.display.push_str(&digit);
        }
    }

    /// Appends a decimal point, at most one per number.
    pub fn press_decimal(&mut self) {
        if self.state.awaiting_new_operand {
            self.state.display = "0.".to_string();
            self.state.awaiting_new_operand = false;
        } else if !self.state.display.contains('.') {
            self.state.display.push('.');
        }
    }

    /// Chooses an operator, evaluating any completed pending operation first
    /// so that chained entry like `5 + 3 + 2 =` folds left-to-right.
    pub fn press_operator(&mut self, operator: Operator) {
        let current = self.current_value();

        match (self.state.previous_value, self.state.pending_operator) {
            (Some(previous), Some(pending)) if !self.state.awaiting_new_operand => {
                let result = pending.apply(previous, current);
                self.state.previous_value = Some(result);
                self.state.display = format_value(result);
            }
            (None, _) => {
                self.state.previous_value = Some(current);
            }
            // Operator pressed twice in a row: keep the left operand and
            // simply replace the pending operator.
            _ => {}
        }

        self.state.pending_operator = Some(operator);
        self.state.awaiting_new_operand = true;
    }

    /// Completes the pending calculation.
    ///
    /// Returns the emitted history entry, or `None` when no operation was
    /// pending (`=` is then a no-op on state).
    pub fn press_equals(&mut self) -> Option<HistoryEntry> {
        let (left, operator) = match (self.state.previous_value, self.state.pending_operator) {
            (Some(left), Some(operator)) => (left, operator),
            _ => return None,
        };

        let right = self.current_value();
        let actual = operator.apply(left, right);
        let outcome = resolve_forcing(operator, left, right, actual, &self.rule);

        if self.config.forcing_mode == ForcingMode::OneShot && outcome.forced {
            self.rule = ForcingRule::default();
        }

        self.state.display = format_value(outcome.final_result);
        self.state.previous_value = None;
        self.state.pending_operator = None;
        self.state.awaiting_new_operand = true;

        let expression = format!(
            "{} {} {}",
            format_value(left),
            operator.symbol(),
            format_value(right)
        );
        Some(HistoryEntry::from_calculation(
            expression,
            actual,
            outcome,
            operator.operation_type(),
        ))
    }

    pub fn press_clear(&mut self) {
        self.state = CalculatorState::default();
    }

    pub fn press_toggle_sign(&mut self) {
        let negated = -self.current_value();
        self.state.display = format_value(negated);
    }

    pub fn press_percent(&mut self) {
        match self.config.percent_mode {
            PercentMode::Unary => {
                let value = self.current_value() / 100.0;
                self.state.display = format_value(value);
            }
            PercentMode::Binary => self.press_operator(Operator::Remainder),
        }
    }

    pub fn press_backspace(&mut self) {
        self.state.display.pop();
        if self.state.display.is_empty() || self.state.display == "-" {
            self.state.display = "0".to_string();
        }
    }

    /// Explicit age-from-birth-year mode.
    ///
    /// The original overloaded this onto a bare `=` press for any 4-digit
    /// display, silently changing calculator semantics; here it is a separate
    /// operation. Returns `None` unless the display holds a plausible
    /// 4-digit year no later than `current_year`.
    pub fn age_from_year(&mut self, current_year: i32) -> Option<HistoryEntry> {
        let value = self.current_value();
        if value.fract() != 0.0 {
            return None;
        }
        let year = value as i32;
        if !(1000..=9999).contains(&year) || year > current_year {
            return None;
        }

        let age = f64::from(current_year - year);
        self.state.display = format_value(age);
        self.state.previous_value = None;
        self.state.pending_operator = None;
        self.state.awaiting_new_operand = true;

        Some(HistoryEntry::from_age(year, age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_concatenate_without_leading_zero() {
        let mut calc = Calculator::default();
        calc.press_digit(0);
        calc.press_digit(5);
        assert_eq!(calc.display(), "5");
        calc.press_digit(7);
        assert_eq!(calc.display(), "57");
    }

    #[test]
    fn duplicate_decimal_is_ignored() {
        let mut calc = Calculator::default();
        calc.press_digit(1);
        calc.press_decimal();
        calc.press_decimal();
        calc.press_digit(5);
        assert_eq!(calc.display(), "1.5");
    }

    #[test]
    fn decimal_on_fresh_operand_starts_at_zero() {
        let mut calc = Calculator::default();
        calc.press_digit(2);
        calc.press_operator(Operator::Add);
        calc.press_decimal();
        assert_eq!(calc.display(), "0.");
    }

    #[test]
    fn apply_matches_native_float_arithmetic() {
        let cases = [(0.1_f64, 0.2_f64), (5.0, 3.0), (-7.5, 2.5), (1e300, 1e300)];
        for (left, right) in cases {
            assert_eq!(Operator::Add.apply(left, right).to_bits(), (left + right).to_bits());
            assert_eq!(
                Operator::Subtract.apply(left, right).to_bits(),
                (left - right).to_bits()
            );
            assert_eq!(
                Operator::Multiply.apply(left, right).to_bits(),
                (left * right).to_bits()
            );
            assert_eq!(
                Operator::Divide.apply(left, right).to_bits(),
                (left / right).to_bits()
            );
            assert_eq!(
                Operator::Remainder.apply(left, right).to_bits(),
                (left % right).to_bits()
            );
        }
    }

    #[test]
    fn chained_operators_fold_left_to_right() {
        let mut calc = Calculator::default();
        calc.press_digit(5);
        calc.press_operator(Operator::Add);
        calc.press_digit(3);
        calc.press_operator(Operator::Add);
        assert_eq!(calc.display(), "8");
        calc.press_digit(2);
        let entry = calc.press_equals().unwrap();
        assert_eq!(entry.result, 10.0);
        assert_eq!(calc.display(), "10");
    }

    #[test]
    fn repeated_operator_press_replaces_pending() {
        let mut calc = Calculator::default();
        calc.press_digit(6);
        calc.press_operator(Operator::Add);
        calc.press_operator(Operator::Multiply);
        calc.press_digit(4);
        let entry = calc.press_equals().unwrap();
        assert_eq!(entry.result, 24.0);
    }

    #[test]
    fn equals_without_pending_operator_is_a_no_op() {
        let mut calc = Calculator::default();
        calc.press_digit(7);
        assert!(calc.press_equals().is_none());
        assert_eq!(calc.display(), "7");
    }

    #[test]
    fn clear_resets_everything() {
        let mut calc = Calculator::default();
        calc.press_digit(9);
        calc.press_operator(Operator::Add);
        calc.press_clear();
        assert_eq!(calc.state(), &CalculatorState::default());
    }

    #[test]
    fn toggle_sign_negates_display() {
        let mut calc = Calculator::default();
        calc.press_digit(4);
        calc.press_toggle_sign();
        assert_eq!(calc.display(), "-4");
        calc.press_toggle_sign();
        assert_eq!(calc.display(), "4");
    }

    #[test]
    fn unary_percent_divides_by_hundred() {
        let mut calc = Calculator::default();
        calc.press_digit(5);
        calc.press_digit(0);
        calc.press_percent();
        assert_eq!(calc.display(), "0.5");
    }

    #[test]
    fn binary_percent_uses_operand_machinery() {
        let mut calc = Calculator::new(CalculatorConfig {
            percent_mode: PercentMode::Binary,
            ..Default::default()
        });
        calc.press_digit(7);
        calc.press_percent();
        calc.press_digit(4);
        let entry = calc.press_equals().unwrap();
        assert_eq!(entry.result, 3.0);
        assert_eq!(entry.operation_type, OperationType::Mixed);
    }

    #[test]
    fn backspace_truncates_and_bottoms_out_at_zero() {
        let mut calc = Calculator::default();
        calc.press_digit(1);
        calc.press_digit(2);
        calc.press_backspace();
        assert_eq!(calc.display(), "1");
        calc.press_backspace();
        assert_eq!(calc.display(), "0");
        calc.press_backspace();
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn division_by_zero_renders_infinity() {
        let mut calc = Calculator::default();
        calc.press_digit(8);
        calc.press_operator(Operator::Divide);
        calc.press_digit(0);
        let entry = calc.press_equals().unwrap();
        assert_eq!(calc.display(), "Infinity");
        assert_eq!(entry.result, f64::INFINITY);
    }

    #[test]
    fn zero_divided_by_zero_renders_nan() {
        let mut calc = Calculator::default();
        calc.press_digit(0);
        calc.press_operator(Operator::Divide);
        calc.press_digit(0);
        calc.press_equals();
        assert_eq!(calc.display(), "NaN");
    }

    #[test]
    fn one_shot_forcing_clears_rule_after_use() {
        let mut calc = Calculator::new(CalculatorConfig {
            forcing_mode: ForcingMode::OneShot,
            ..Default::default()
        });
        calc.set_rule(ForcingRule {
            forced_number: Some(42.0),
            ..Default::default()
        });

        calc.press_digit(5);
        calc.press_operator(Operator::Add);
        calc.press_digit(3);
        let entry = calc.press_equals().unwrap();
        assert!(entry.forced);
        assert!(calc.rule().is_empty());

        calc.press_digit(5);
        calc.press_operator(Operator::Add);
        calc.press_digit(3);
        let entry = calc.press_equals().unwrap();
        assert!(!entry.forced);
        assert_eq!(entry.result, 8.0);
    }

    #[test]
    fn persistent_forcing_survives_multiple_uses() {
        let mut calc = Calculator::default();
        calc.set_rule(ForcingRule {
            forced_number: Some(42.0),
            ..Default::default()
        });
        for _ in 0..2 {
            calc.press_digit(1);
            calc.press_operator(Operator::Add);
            calc.press_digit(1);
            let entry = calc.press_equals().unwrap();
            assert_eq!(entry.result, 42.0);
        }
    }

    #[test]
    fn age_mode_requires_a_plausible_year() {
        let mut calc = Calculator::default();
        calc.press_digit(1);
        calc.press_digit(9);
        calc.press_digit(9);
        calc.press_digit(0);
        let entry = calc.age_from_year(2026).unwrap();
        assert_eq!(entry.result, 36.0);
        assert_eq!(entry.operation_type, OperationType::AgeCalculation);
        assert_eq!(calc.display(), "36");

        calc.press_clear();
        calc.press_digit(3);
        calc.press_digit(0);
        assert!(calc.age_from_year(2026).is_none());
    }
}
