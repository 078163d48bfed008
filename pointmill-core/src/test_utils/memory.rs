// File: pointmill-core/src/test_utils/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::account::Account;
use pointmill_common::models::catalog::RewardOption;
use pointmill_common::models::ledger::{sources, LedgerEntry, LedgerEntryKind};
use pointmill_common::models::quota::ActivityKind;
use pointmill_common::models::redemption::{RedemptionContact, RedemptionRequest};
use pointmill_common::traits::repository_traits::{
    AccountRepository, LedgerRepository, QuotaRepository, RedemptionRepository,
};

/// In-memory stand-in for the Postgres store, implementing all four
/// repository traits. Every operation holds the single state lock for its
/// whole critical section, which mirrors the per-transaction atomicity of
/// the real store. Flipping `set_unreachable(true)` makes each call fail
/// the way a dead connection pool does.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    unreachable: AtomicBool,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    entries: Vec<LedgerEntry>,
    quota: HashMap<(Uuid, ActivityKind, String), i64>,
    redemptions: Vec<RedemptionRequest>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), Error> {
        if self.unreachable.load(Ordering::SeqCst) {
            // The closest sqlx error to "the backend is gone".
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory backend state lock poisoned")
    }

    /// Insert a fresh zero-balance account and return it. Balances are
    /// only ever funded through ledger writes, so conservation checks
    /// hold from the start.
    pub fn seed_account(&self, email: &str) -> Account {
        let account = Account::new(email, None);
        self.state().accounts.insert(account.account_id, account.clone());
        account
    }

    /// Snapshot of an account without going through the async trait.
    pub fn account_state(&self, account_id: Uuid) -> Option<Account> {
        self.state().accounts.get(&account_id).cloned()
    }

    /// All ledger entries for an account, in insertion order.
    pub fn entries_for(&self, account_id: Uuid) -> Vec<LedgerEntry> {
        self.state()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl AccountRepository for MemoryBackend {
    async fn create(&self, account: &Account) -> Result<(), Error> {
        self.check_reachable()?;
        let mut state = self.state();
        if state.accounts.contains_key(&account.account_id) {
            return Err("account already exists".into());
        }
        if state.accounts.values().any(|a| a.email == account.email) {
            return Err("email already registered".into());
        }
        state.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, Error> {
        self.check_reachable()?;
        Ok(self.state().accounts.get(&account_id).cloned())
    }
}

#[async_trait::async_trait]
impl LedgerRepository for MemoryBackend {
    async fn record(&self, entry: &LedgerEntry) -> Result<(), Error> {
        self.check_reachable()?;
        if entry.amount <= 0 {
            return Err(Error::InvalidAmount(entry.amount));
        }

        let mut guard = self.state();
        let state = &mut *guard;
        let account = state
            .accounts
            .get_mut(&entry.account_id)
            .ok_or_else(|| Error::NotFound(format!("account {}", entry.account_id)))?;

        match entry.kind {
            LedgerEntryKind::Earn => {
                account.points += entry.amount;
                account.total_earned += entry.amount;
            }
            LedgerEntryKind::Redeem => {
                if account.points < entry.amount {
                    // Nothing is written; mirrors the CHECK-driven rollback.
                    return Err(Error::InsufficientPoints {
                        balance: account.points,
                        required: entry.amount,
                    });
                }
                account.points -= entry.amount;
            }
        }
        account.updated_at = entry.created_at;
        state.entries.push(entry.clone());
        Ok(())
    }

    async fn has_entry_with_source(&self, account_id: Uuid, source: &str) -> Result<bool, Error> {
        self.check_reachable()?;
        Ok(self
            .state()
            .entries
            .iter()
            .any(|e| e.account_id == account_id && e.source.as_deref() == Some(source)))
    }

    async fn grant_signup_bonus_if_missing(
        &self,
        account_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<bool, Error> {
        self.check_reachable()?;
        let mut guard = self.state();
        let state = &mut *guard;

        let already = state
            .entries
            .iter()
            .any(|e| e.account_id == account_id && e.source.as_deref() == Some(sources::SIGNUP));
        if already {
            return Ok(false);
        }

        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        account.points += amount;
        account.total_earned += amount;
        account.updated_at = Utc::now();

        let entry = LedgerEntry::new(
            account_id,
            LedgerEntryKind::Earn,
            amount,
            Some(sources::SIGNUP),
            description,
        );
        state.entries.push(entry);
        Ok(true)
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        self.check_reachable()?;
        Ok(self.entries_for(account_id))
    }
}

#[async_trait::async_trait]
impl QuotaRepository for MemoryBackend {
    async fn used(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
    ) -> Result<i64, Error> {
        self.check_reachable()?;
        Ok(self
            .state()
            .quota
            .get(&(account_id, activity, day_key.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn increment_with_cap(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
        cap: i64,
    ) -> Result<Option<i64>, Error> {
        self.check_reachable()?;
        if cap <= 0 {
            return Ok(None);
        }

        let mut state = self.state();
        let counter = state
            .quota
            .entry((account_id, activity, day_key.to_string()))
            .or_insert(0);
        if *counter >= cap {
            return Ok(None);
        }
        *counter += 1;
        Ok(Some(*counter))
    }
}

#[async_trait::async_trait]
impl RedemptionRepository for MemoryBackend {
    async fn create(
        &self,
        account_id: Uuid,
        option: &RewardOption,
        contact: &RedemptionContact,
    ) -> Result<RedemptionRequest, Error> {
        self.check_reachable()?;
        let mut guard = self.state();
        let state = &mut *guard;

        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        if account.points < option.points_cost {
            return Err(Error::InsufficientPoints {
                balance: account.points,
                required: option.points_cost,
            });
        }

        let request = RedemptionRequest::new(account_id, option, contact);
        account.points -= option.points_cost;
        account.updated_at = request.created_at;

        let debit = LedgerEntry::new(
            account_id,
            LedgerEntryKind::Redeem,
            option.points_cost,
            Some(sources::REDEMPTION),
            &option.debit_description(),
        );
        state.entries.push(debit);
        state.redemptions.push(request.clone());
        Ok(request)
    }

    async fn get(&self, redemption_id: Uuid) -> Result<Option<RedemptionRequest>, Error> {
        self.check_reachable()?;
        Ok(self
            .state()
            .redemptions
            .iter()
            .find(|r| r.redemption_id == redemption_id)
            .cloned())
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<RedemptionRequest>, Error> {
        self.check_reachable()?;
        Ok(self
            .state()
            .redemptions
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }
}
