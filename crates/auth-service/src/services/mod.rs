//! Service layer: credential resolution, account lifecycle, and
//! administrative token queries.

pub mod account;
pub mod authentication;
pub mod tokens;
