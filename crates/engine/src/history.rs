//! The module contains the calculation history types and the local list
//! semantics the synchronizer builds on.

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use crate::forcing::ForcingOutcome;

/// Local history is truncated to this many entries after every append and
/// merge to bound storage.
pub const HISTORY_CAP: usize = 100;

/// Category of a completed calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Mixed,
    AgeCalculation,
}

impl OperationType {
    pub const ALL: [Self; 6] = [
        Self::Addition,
        Self::Subtraction,
        Self::Multiplication,
        Self::Division,
        Self::Mixed,
        Self::AgeCalculation,
    ];

    /// Canonical string used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
            Self::Mixed => "mixed",
            Self::AgeCalculation => "age_calculation",
        }
    }
}

impl TryFrom<&str> for OperationType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "addition" => Ok(Self::Addition),
            "subtraction" => Ok(Self::Subtraction),
            "multiplication" => Ok(Self::Multiplication),
            "division" => Ok(Self::Division),
            "mixed" => Ok(Self::Mixed),
            "age_calculation" => Ok(Self::AgeCalculation),
            other => Err(format!("unknown operation type: {other}")),
        }
    }
}

/// One completed calculation.
///
/// Entries are immutable once created except for the `synced` flag, which
/// flips when the remote store confirms persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Client-generated millisecond-epoch identifier, unique per entry until
    /// the remote store reassigns its own.
    pub id: i64,
    /// Human-readable `"<left> <operator> <right>"`, or a synthetic label for
    /// non-arithmetic entries.
    pub expression: String,
    /// The unforced arithmetic answer.
    pub actual_result: f64,
    /// The overriding value when forcing applied.
    pub forced_result: Option<f64>,
    /// The value actually shown to the user.
    pub result: f64,
    pub forced: bool,
    pub operation_type: OperationType,
    /// Locale-formatted capture time.
    pub timestamp: String,
    pub synced: bool,
}

impl HistoryEntry {
    pub fn from_calculation(
        expression: String,
        actual_result: f64,
        outcome: ForcingOutcome,
        operation_type: OperationType,
    ) -> Self {
        Self {
            id: Utc::now().timestamp_millis(),
            expression,
            actual_result,
            forced_result: outcome.forced_result,
            result: outcome.final_result,
            forced: outcome.forced,
            operation_type,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            synced: false,
        }
    }

    pub fn from_age(year: i32, age: f64) -> Self {
        Self {
            id: Utc::now().timestamp_millis(),
            expression: format!("age from {year}"),
            actual_result: age,
            forced_result: None,
            result: age,
            forced: false,
            operation_type: OperationType::AgeCalculation,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            synced: false,
        }
    }
}

/// Ordered local history, most-recent-first.
///
/// Append-only except for the bulk clear; capped at [`HISTORY_CAP`] entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        let mut log = Self { entries };
        log.truncate();
        log
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepends a fresh, unsynced entry.
    pub fn append(&mut self, mut entry: HistoryEntry) {
        entry.synced = false;
        self.entries.insert(0, entry);
        self.truncate();
    }

    /// Entries not yet confirmed by the remote store.
    pub fn unsynced(&self) -> Vec<&HistoryEntry> {
        self.entries.iter().filter(|entry| !entry.synced).collect()
    }

    /// Marks every unsynced entry as persisted remotely.
    pub fn mark_all_synced(&mut self) {
        for entry in &mut self.entries {
            entry.synced = true;
        }
    }

    /// Merges remote entries with the local list.
    ///
    /// Remote entries come first (they are already synced); local entries
    /// survive when no remote entry shares their expression. Expression
    /// equality is a weak key (identical calculations at different times
    /// collide), kept for compatibility with the stored data.
    pub fn merge_remote(&mut self, remote: Vec<HistoryEntry>) {
        let mut merged = remote;
        for entry in &mut merged {
            entry.synced = true;
        }

        for local in self.entries.drain(..) {
            if !merged.iter().any(|entry| entry.expression == local.expression) {
                merged.push(local);
            }
        }

        self.entries = merged;
        self.truncate();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn truncate(&mut self) {
        self.entries.truncate(HISTORY_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expression: &str, synced: bool) -> HistoryEntry {
        HistoryEntry {
            id: 1,
            expression: expression.to_string(),
            actual_result: 4.0,
            forced_result: None,
            result: 4.0,
            forced: false,
            operation_type: OperationType::Addition,
            timestamp: "2026-01-01 12:00:00".to_string(),
            synced,
        }
    }

    #[test]
    fn append_prepends_unsynced() {
        let mut log = HistoryLog::default();
        log.append(entry("1 + 1", true));
        log.append(entry("2 + 2", false));

        assert_eq!(log.entries()[0].expression, "2 + 2");
        assert!(log.entries().iter().all(|e| !e.synced));
    }

    #[test]
    fn merge_dedups_by_expression_remote_first() {
        let mut log = HistoryLog::default();
        log.append(entry("3 + 3", false));
        log.append(entry("2 + 2", false));

        log.merge_remote(vec![entry("2 + 2", false)]);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].expression, "2 + 2");
        assert!(log.entries()[0].synced);
        assert_eq!(log.entries()[1].expression, "3 + 3");
        assert!(!log.entries()[1].synced);
    }

    #[test]
    fn merge_caps_the_list() {
        let remote = (0..150)
            .map(|i| entry(&format!("{i} + {i}"), false))
            .collect();
        let mut log = HistoryLog::default();
        log.merge_remote(remote);
        assert_eq!(log.len(), HISTORY_CAP);
    }

    #[test]
    fn mark_all_synced_flips_every_entry() {
        let mut log = HistoryLog::default();
        log.append(entry("1 + 1", false));
        log.append(entry("2 + 2", false));
        assert_eq!(log.unsynced().len(), 2);

        log.mark_all_synced();
        assert!(log.unsynced().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut log = HistoryLog::default();
        log.append(entry("1 + 1", false));
        log.clear();
        assert!(log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn entry_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(entry("2 + 2", false)).unwrap();
        assert!(json.get("actualResult").is_some());
        assert!(json.get("forcedResult").is_some());
        assert_eq!(json["operationType"], "addition");
    }
}
