//! Background tasks.

pub mod token_sweep;
