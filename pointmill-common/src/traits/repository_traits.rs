use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;
use crate::models::account::Account;
use crate::models::catalog::RewardOption;
use crate::models::ledger::LedgerEntry;
use crate::models::quota::ActivityKind;
use crate::models::redemption::{RedemptionContact, RedemptionRequest};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, account: &Account) -> Result<(), Error>;
    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, Error>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert the entry and apply its balance effect as one atomic unit.
    /// On any failure nothing is written and the balance is untouched.
    async fn record(&self, entry: &LedgerEntry) -> Result<(), Error>;

    async fn has_entry_with_source(&self, account_id: Uuid, source: &str) -> Result<bool, Error>;

    /// Store-side atomic check-and-insert of the one-time signup bonus.
    /// Returns true only for the call that actually granted it; every
    /// later (or concurrently losing) call gets false.
    async fn grant_signup_bonus_if_missing(
        &self,
        account_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<bool, Error>;

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error>;
}

#[async_trait]
pub trait QuotaRepository: Send + Sync {
    async fn used(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
    ) -> Result<i64, Error>;

    /// Atomically add one attempt while the counter is below `cap`.
    /// Returns the new count, or None when the cap had already been hit
    /// (nothing is written in that case).
    async fn increment_with_cap(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
        cap: i64,
    ) -> Result<Option<i64>, Error>;
}

#[async_trait]
pub trait RedemptionRepository: Send + Sync {
    /// Create the request and its points debit in one atomic unit. Fails
    /// with [`Error::InsufficientPoints`] before writing anything when the
    /// balance does not cover the cost.
    async fn create(
        &self,
        account_id: Uuid,
        option: &RewardOption,
        contact: &RedemptionContact,
    ) -> Result<RedemptionRequest, Error>;

    async fn get(&self, redemption_id: Uuid) -> Result<Option<RedemptionRequest>, Error>;

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<RedemptionRequest>, Error>;
}
