//! Device-side pieces of the prestidigit calculator: the API client, the
//! durable local store and the history synchronizer. The binary in
//! `main.rs` wires them into an interactive session.

pub mod client;
pub mod config;
pub mod error;
pub mod local_store;
pub mod sync;
