//! Live end-to-end tests against a real cluster with the table controller
//! installed and AWS credentials in the environment.
//!
//! The shared harness lives in `common.rs`.  These are ignored by default:
//! they create real tables and take several minutes.
//!
//! Run with: `cargo test --test e2e -- --ignored --test-threads=1`

mod common;
