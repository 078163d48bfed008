// File: src/services/ledger_service.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use pointmill_common::models::ledger::{LedgerEntry, LedgerEntryKind};
use pointmill_common::traits::repository_traits::{AccountRepository, LedgerRepository};
use crate::Error;

/// Writes balance movements. Validation happens here; atomicity (entry
/// plus balance update, all or nothing) is the repository's contract. A
/// failed or timed-out write must be followed by a fresh read, never by
/// assuming the intended effect.
pub struct LedgerService {
    ledger_repo: Arc<dyn LedgerRepository + Send + Sync>,
    account_repo: Arc<dyn AccountRepository + Send + Sync>,
    remote_timeout: Duration,
}

impl LedgerService {
    pub fn new(
        ledger_repo: Arc<dyn LedgerRepository + Send + Sync>,
        account_repo: Arc<dyn AccountRepository + Send + Sync>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            ledger_repo,
            account_repo,
            remote_timeout,
        }
    }

    pub async fn record(
        &self,
        account_id: Uuid,
        kind: LedgerEntryKind,
        amount: i64,
        source: Option<&str>,
        description: &str,
    ) -> Result<LedgerEntry, Error> {
        if amount <= 0 {
            return Err(Error::InvalidAmount(amount));
        }

        let entry = LedgerEntry::new(account_id, kind, amount, source, description);
        timeout(self.remote_timeout, self.ledger_repo.record(&entry)).await??;
        debug!(
            "recorded {} of {} points for {} (source {:?})",
            kind, amount, account_id, entry.source
        );
        Ok(entry)
    }

    pub async fn record_earn(
        &self,
        account_id: Uuid,
        amount: i64,
        source: Option<&str>,
        description: &str,
    ) -> Result<LedgerEntry, Error> {
        self.record(account_id, LedgerEntryKind::Earn, amount, source, description)
            .await
    }

    pub async fn record_redeem(
        &self,
        account_id: Uuid,
        amount: i64,
        source: Option<&str>,
        description: &str,
    ) -> Result<LedgerEntry, Error> {
        self.record(account_id, LedgerEntryKind::Redeem, amount, source, description)
            .await
    }

    pub async fn history(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        Ok(timeout(self.remote_timeout, self.ledger_repo.list_for_account(account_id)).await??)
    }

    /// Recompute the conservation sums from the raw entries and report
    /// them next to the stored balance columns.
    pub async fn audit(&self, account_id: Uuid) -> Result<LedgerAudit, Error> {
        let account = timeout(self.remote_timeout, self.account_repo.get(account_id))
            .await??
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        let entries = self.history(account_id).await?;

        let earned_sum: i64 = entries
            .iter()
            .filter(|e| e.kind == LedgerEntryKind::Earn)
            .map(|e| e.amount)
            .sum();
        let redeemed_sum: i64 = entries
            .iter()
            .filter(|e| e.kind == LedgerEntryKind::Redeem)
            .map(|e| e.amount)
            .sum();

        Ok(LedgerAudit {
            account_id,
            points: account.points,
            total_earned: account.total_earned,
            earned_sum,
            redeemed_sum,
        })
    }
}

/// Snapshot comparing stored balances with sums over the ledger.
#[derive(Debug, Clone, Copy)]
pub struct LedgerAudit {
    pub account_id: Uuid,
    pub points: i64,
    pub total_earned: i64,
    pub earned_sum: i64,
    pub redeemed_sum: i64,
}

impl LedgerAudit {
    /// points == earned - redeemed, and total_earned == earned.
    pub fn is_consistent(&self) -> bool {
        self.points == self.earned_sum - self.redeemed_sum
            && self.total_earned == self.earned_sum
    }
}
