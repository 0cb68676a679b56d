//! Token expiry sweep background task.
//!
//! Periodically marks session tokens older than the configured TTL as
//! expired. The sweep is the authoritative revocation mechanism: a token's
//! signed `exp` claim stays valid long after the sweep has revoked it.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, the task completes its current iteration and exits
//! cleanly.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::observability::metrics;
use crate::store::TokenStore;

/// Configuration for the token sweep task.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Sweep tick interval in seconds.
    pub interval_seconds: u64,
    /// Minutes after issuance at which a token is revoked.
    pub ttl_minutes: i64,
}

impl SweepConfig {
    pub fn new(interval_seconds: u64, ttl_minutes: i64) -> Self {
        Self {
            interval_seconds,
            ttl_minutes,
        }
    }
}

/// Start the token sweep background task.
///
/// Schedules one sweep per interval tick until the cancellation token
/// triggers. Iterations run on their own task and are single-flight: if a
/// sweep is still running when the next tick fires, that tick is skipped
/// rather than stacking a second sweep. Cancellation stops scheduling; a
/// sweep already in flight runs to completion in the background, which is
/// safe because `mark_expired` is idempotent.
#[instrument(skip_all, name = "auth.task.token_sweep")]
pub async fn start_token_sweep(
    tokens: Arc<dyn TokenStore>,
    config: SweepConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "auth.task.token_sweep",
        interval_seconds = config.interval_seconds,
        ttl_minutes = config.ttl_minutes,
        "Starting token sweep task"
    );

    let in_flight = Arc::new(Mutex::new(()));
    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match Arc::clone(&in_flight).try_lock_owned() {
                    Ok(guard) => {
                        let tokens = Arc::clone(&tokens);
                        let ttl_minutes = config.ttl_minutes;
                        tokio::spawn(async move {
                            let _guard = guard;
                            run_sweep(tokens.as_ref(), ttl_minutes).await;
                        });
                    }
                    Err(_) => {
                        tracing::warn!(
                            target: "auth.task.token_sweep",
                            "Previous sweep still running, skipping tick"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "auth.task.token_sweep",
                    "Token sweep task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "auth.task.token_sweep", "Token sweep task stopped");
}

/// Run a single sweep iteration.
///
/// Separated from the main loop so tests can drive it directly.
pub(crate) async fn run_sweep(tokens: &dyn TokenStore, ttl_minutes: i64) {
    let threshold = Utc::now() - ChronoDuration::minutes(ttl_minutes);

    let stale = match tokens.find_stale(threshold).await {
        Ok(stale) => stale,
        Err(e) => {
            tracing::error!(
                target: "auth.task.token_sweep",
                error = %e,
                "Failed to query stale tokens"
            );
            return;
        }
    };

    if stale.is_empty() {
        return;
    }

    let ids: Vec<_> = stale.iter().map(|t| t.id).collect();
    match tokens.mark_expired(&ids).await {
        Ok(count) => {
            metrics::record_tokens_swept(count);
            info!(
                target: "auth.task.token_sweep",
                revoked = count,
                ttl_minutes = ttl_minutes,
                "Revoked stale tokens"
            );
        }
        Err(e) => {
            tracing::error!(
                target: "auth.task.token_sweep",
                error = %e,
                "Failed to mark stale tokens expired"
            );
        }
    }
}
