//! Observability helpers.

pub mod metrics;
