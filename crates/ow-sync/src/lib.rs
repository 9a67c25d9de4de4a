//! State synchronization and alerting engine of the orgwatch dashboard.
//!
//! - [`client::ApiClient`]: authenticated reads and writes against the backend
//! - [`aggregator::SnapshotAggregator`]: concurrent reads assembled into one
//!   [`store::ViewModel`], all-or-nothing
//! - [`store::ViewStore`]: last-issued-wins application of refresh results
//! - [`scheduler::SyncScheduler`]: fixed-cadence, single-flight polling that
//!   feeds the budget alert state machine

pub mod aggregator;
pub mod backend;
pub mod client;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod shutdown;
pub mod store;

pub use error::{Result, SyncError};
