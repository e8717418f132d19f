//! Phased load harness comparing column scan, indexed scan and full-text
//! search lookups across restaurant query dimensions.

pub mod client;
pub mod config;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod gate;
pub mod install;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod phase;
pub mod query;
pub mod roles;

pub use error::BenchError;
