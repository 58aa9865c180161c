//! Metrics for portico.
//!
//! Metric names live in one place so the router, the evaluator and any
//! dashboard agree on them. Recording goes through the `metrics` facade; with
//! the `prometheus` feature the recorder renders the Prometheus text format.
//!
//! ```rust,ignore
//! use portico_metrics::{counter, delivery};
//!
//! counter!(delivery::ATTEMPTS_TOTAL, "path" => "http", "outcome" => "ok").increment(1);
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
