//! table-replica-e2e: end-to-end convergence checks for replicated Table
//! custom resources.
//!
//! Desired state goes in through the Kubernetes API ([`control_plane`]);
//! observed state comes back from the managed-table service
//! ([`table_status`]).  The [`poller`] bridges the two with fixed-interval
//! polling over [`predicate`]s, and the [`driver`] turns that into
//! scenario steps with strict post-convergence checks.

pub mod config;
pub mod control_plane;
pub mod crd;
pub mod driver;
pub mod error;
pub mod helpers;
pub mod observed;
pub mod poller;
pub mod predicate;
pub mod scenarios;
pub mod table_status;
pub mod terminal;
