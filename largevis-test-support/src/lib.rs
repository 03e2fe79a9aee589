//! Shared test utilities used across largevis crates.
//!
//! - [`recording`] captures `tracing` spans and events so tests can assert on
//!   the instrumentation emitted by the engines.
//! - [`proptest_profile`] reads environment overrides for property-test case
//!   counts and forking.

pub mod proptest_profile;
pub mod recording;
