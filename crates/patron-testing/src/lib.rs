//! Test utilities for Patron services.
//!
//! Provides webhook payload builders for pipeline tests.
//! Import in `#[cfg(test)]` blocks and `tests/` targets only — never in
//! production code.

pub mod webhook;
