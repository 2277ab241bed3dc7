//! # fieldsync
//!
//! Optimistic field-synchronization engine for inline-editable values.
//!
//! Each editable field gets a session that accepts rapid local edits
//! without blocking, debounces the write, keeps at most one commit in
//! flight, coalesces edits that arrive mid-commit, rolls the displayed
//! value back on failure, and supports an explicit retry. Callers supply
//! an async commit handler (and optionally a validator) and render from
//! the snapshots the session publishes.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod session;
pub mod telemetry;
