//! Core logic of the prestidigit calculator.
//!
//! The crate is pure: no I/O, no async, no persistence. It contains the
//! calculator state machine ([`Calculator`]), the forcing resolver
//! ([`resolve_forcing`]) and the local history semantics ([`HistoryLog`]).
//! Hosts (the CLI, the server) wire these into storage and network.

pub use calculator::{
    Calculator, CalculatorConfig, CalculatorState, ForcingMode, Operator, PercentMode,
    format_value,
};
pub use forcing::{ForcingOutcome, ForcingRule, resolve_forcing};
pub use history::{HISTORY_CAP, HistoryEntry, HistoryLog, OperationType};

mod calculator;
mod forcing;
pub mod history;
