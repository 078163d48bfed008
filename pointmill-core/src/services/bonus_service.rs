// File: src/services/bonus_service.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use pointmill_common::models::ledger::sources;
use pointmill_common::traits::repository_traits::LedgerRepository;
use crate::Error;

/// One-time signup bonus, in points.
pub const SIGNUP_BONUS_POINTS: i64 = 100;

/// Answer from a bonus trigger. An already-granted bonus is a normal
/// outcome here, not an error; callers fire triggers freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusOutcome {
    Granted,
    AlreadyGranted,
    /// The store could not be reached. Retrying later is safe since every
    /// retry goes through the same idempotent grant.
    Deferred,
}

/// Issues the signup bonus. All triggers funnel through here, and the
/// `signup` ledger source is reserved for this service; that tag is the
/// idempotency key the store enforces.
pub struct BonusIssuer {
    ledger_repo: Arc<dyn LedgerRepository + Send + Sync>,
    remote_timeout: Duration,
}

impl BonusIssuer {
    pub fn new(ledger_repo: Arc<dyn LedgerRepository + Send + Sync>, remote_timeout: Duration) -> Self {
        Self {
            ledger_repo,
            remote_timeout,
        }
    }

    pub async fn issue_if_missing(&self, account_id: Uuid) -> Result<BonusOutcome, Error> {
        // Cheap read first; most triggers after the first sign-in stop here.
        let existing = timeout(
            self.remote_timeout,
            self.ledger_repo.has_entry_with_source(account_id, sources::SIGNUP),
        )
        .await;

        match existing {
            Ok(Ok(true)) => return Ok(BonusOutcome::AlreadyGranted),
            Ok(Ok(false)) => {}
            Ok(Err(e)) if e.is_retryable() => {
                warn!("signup bonus check unreachable for {}: {}", account_id, e);
                return Ok(BonusOutcome::Deferred);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    "signup bonus check timed out after {:?} for {}",
                    self.remote_timeout, account_id
                );
                return Ok(BonusOutcome::Deferred);
            }
        }

        // The read can race another trigger, so the grant itself is a
        // store-side check-and-insert; exactly one caller gets true.
        let granted = timeout(
            self.remote_timeout,
            self.ledger_repo.grant_signup_bonus_if_missing(
                account_id,
                SIGNUP_BONUS_POINTS,
                "Signup bonus",
            ),
        )
        .await;

        match granted {
            Ok(Ok(true)) => {
                info!(
                    "granted signup bonus of {} points to {}",
                    SIGNUP_BONUS_POINTS, account_id
                );
                Ok(BonusOutcome::Granted)
            }
            Ok(Ok(false)) => Ok(BonusOutcome::AlreadyGranted),
            Ok(Err(e)) if e.is_retryable() => {
                warn!("signup bonus grant unreachable for {}: {}", account_id, e);
                Ok(BonusOutcome::Deferred)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    "signup bonus grant timed out after {:?} for {}",
                    self.remote_timeout, account_id
                );
                Ok(BonusOutcome::Deferred)
            }
        }
    }
}
