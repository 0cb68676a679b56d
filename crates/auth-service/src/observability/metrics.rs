//! Metrics definitions.
//!
//! All metrics follow Prometheus naming conventions with an `auth_` prefix
//! and a `_total` suffix for counters.
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `scheme`: 2 values (basic, bearer)
//! - `outcome`: 2 values (success, failure)

use metrics::counter;

/// Record an authentication attempt outcome.
///
/// Metric: `auth_attempts_total`
/// Labels: `scheme`, `outcome`
pub fn record_authentication(scheme: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("auth_attempts_total",
        "scheme" => scheme,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a newly issued session token.
///
/// Metric: `auth_tokens_issued_total`
pub fn record_token_issued() {
    counter!("auth_tokens_issued_total").increment(1);
}

/// Record tokens revoked by the expiry sweep.
///
/// Metric: `auth_tokens_swept_total`
pub fn record_tokens_swept(count: u64) {
    if count > 0 {
        counter!("auth_tokens_swept_total").increment(count);
    }
}
