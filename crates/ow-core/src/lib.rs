//! Pure, synchronous building blocks of the orgwatch dashboard client.
//!
//! Nothing in this crate performs I/O beyond reading the config file; the
//! async polling machinery lives in `ow-sync`.

pub mod alerts;
pub mod config;
pub mod detail;
pub mod graph;
pub mod notify;
