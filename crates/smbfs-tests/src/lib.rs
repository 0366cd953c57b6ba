//! Test infrastructure for the smbfs workspace.
//!
//! Cross-crate scenarios run against [`harness::TestShare`], an in-memory
//! share wired to a fresh provider. Property-based suites cover the path
//! algebra invariants.

pub mod concurrency;
pub mod harness;
pub mod integration;
pub mod proptest_path;
pub mod watch_integration;

pub use harness::TestShare;
