// File: src/services/quota_tracker.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use pointmill_common::models::quota::{ActivityKind, QuotaAuthority, QuotaOutcome, QuotaStatus};
use pointmill_common::traits::repository_traits::QuotaRepository;
use crate::cache::LocalDayStore;
use crate::utils::time::current_day_key;
use crate::Error;

/// Two-tier daily attempt limiter. The remote counter is authoritative;
/// the local day store answers only while the remote one is unreachable,
/// and the two counts are never merged afterwards.
pub struct QuotaTracker {
    remote: Option<Arc<dyn QuotaRepository + Send + Sync>>,
    local: Arc<LocalDayStore>,
    remote_timeout: Duration,
}

impl QuotaTracker {
    pub fn new(
        remote: Arc<dyn QuotaRepository + Send + Sync>,
        local: Arc<LocalDayStore>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            remote: Some(remote),
            local,
            remote_timeout,
        }
    }

    /// Tracker for the degraded no-backend mode: local counters only.
    pub fn local_only(local: Arc<LocalDayStore>) -> Self {
        Self {
            remote: None,
            local,
            remote_timeout: Duration::from_secs(0),
        }
    }

    /// Attempts left today. Never fails: a remote error or timeout just
    /// demotes the answer to the local tier.
    pub async fn remaining(&self, account_id: Uuid, activity: ActivityKind) -> QuotaStatus {
        self.remaining_on(account_id, activity, &current_day_key()).await
    }

    /// Explicit-day variant. [`remaining`](Self::remaining) recomputes the
    /// key per call so a midnight rollover shows up on the next question.
    pub async fn remaining_on(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
    ) -> QuotaStatus {
        let allowance = activity.daily_allowance();

        if let Some(remote) = &self.remote {
            match timeout(self.remote_timeout, remote.used(account_id, activity, day_key)).await {
                Ok(Ok(used)) => {
                    return QuotaStatus {
                        remaining: (allowance - used).max(0),
                        authority: QuotaAuthority::Remote,
                    };
                }
                Ok(Err(e)) => {
                    warn!("remote quota read failed, answering from local store: {}", e);
                }
                Err(_) => {
                    warn!(
                        "remote quota read timed out after {:?}, answering from local store",
                        self.remote_timeout
                    );
                }
            }
        }

        let used = self.local.used(account_id, activity, day_key);
        QuotaStatus {
            remaining: (allowance - used).max(0),
            authority: QuotaAuthority::LocalFallback,
        }
    }

    /// Consume one attempt for today.
    pub async fn consume(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
    ) -> Result<QuotaOutcome, Error> {
        self.consume_on(account_id, activity, &current_day_key()).await
    }

    /// Explicit-day consume. Falls back to the local counter only on
    /// connection-class failures; a definitive remote answer (consumed or
    /// denied) is final, and hard store errors propagate.
    pub async fn consume_on(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
    ) -> Result<QuotaOutcome, Error> {
        let allowance = activity.daily_allowance();

        if let Some(remote) = &self.remote {
            let attempt = timeout(
                self.remote_timeout,
                remote.increment_with_cap(account_id, activity, day_key, allowance),
            )
            .await;

            match attempt {
                Ok(Ok(Some(used))) => {
                    debug!(
                        "consumed {} attempt {}/{} for {}",
                        activity, used, allowance, account_id
                    );
                    self.local.note_action(account_id, activity);
                    return Ok(QuotaOutcome::Consumed {
                        remaining: (allowance - used).max(0),
                        authority: QuotaAuthority::Remote,
                    });
                }
                Ok(Ok(None)) => {
                    return Ok(QuotaOutcome::Denied {
                        authority: QuotaAuthority::Remote,
                    });
                }
                Ok(Err(e)) if e.is_retryable() => {
                    warn!("remote quota increment failed ({}), using local counter", e);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        "remote quota increment timed out after {:?}, using local counter",
                        self.remote_timeout
                    );
                }
            }
        }

        match self.local.increment_with_cap(account_id, activity, day_key, allowance)? {
            Some(used) => Ok(QuotaOutcome::Consumed {
                remaining: (allowance - used).max(0),
                authority: QuotaAuthority::LocalFallback,
            }),
            None => Ok(QuotaOutcome::Denied {
                authority: QuotaAuthority::LocalFallback,
            }),
        }
    }

    /// Most recent locally observed action for rate display purposes.
    pub fn last_action(&self, account_id: Uuid, activity: ActivityKind) -> Option<DateTime<Utc>> {
        self.local.last_action(account_id, activity)
    }
}
