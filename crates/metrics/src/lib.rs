//! Metrics collection and export for parlor.
//!
//! Uses the `metrics` crate facade. With the `prometheus` feature the recorder
//! renders Prometheus text for the gateway's `/metrics` endpoint; without it
//! every macro call is a no-op.
//!
//! ```rust,ignore
//! use parlor_metrics::{counter, rooms};
//!
//! counter!(rooms::JOINS_TOTAL, "room" => "message").increment(1);
//! ```

mod definitions;
pub mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
