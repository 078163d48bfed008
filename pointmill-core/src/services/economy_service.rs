// File: src/services/economy_service.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use pointmill_common::models::account::Account;
use pointmill_common::models::catalog::RewardCatalog;
use pointmill_common::models::ledger::{sources, LedgerEntry};
use pointmill_common::models::prize::PrizeTable;
use pointmill_common::models::quota::{ActivityKind, QuotaOutcome, QuotaStatus};
use pointmill_common::models::redemption::{DurationTier, RedemptionContact, RedemptionRequest};
use pointmill_common::traits::repository_traits::{
    AccountRepository, LedgerRepository, QuotaRepository, RedemptionRepository,
};
use crate::cache::{BalanceCache, CachedBalance, LocalDayStore};
use crate::repositories::postgres::account::PostgresAccountRepository;
use crate::repositories::postgres::ledger::PostgresLedgerRepository;
use crate::repositories::postgres::quota::PostgresQuotaRepository;
use crate::repositories::postgres::redemption::PostgresRedemptionRepository;
use crate::services::bonus_service::{BonusIssuer, BonusOutcome};
use crate::services::ledger_service::{LedgerAudit, LedgerService};
use crate::services::quota_tracker::QuotaTracker;
use crate::services::redemption_service::RedemptionService;
use crate::Error;

/// The repository set the engine talks to, bundled so call sites wire the
/// store up once.
#[derive(Clone)]
pub struct EconomyBackend {
    pub accounts: Arc<dyn AccountRepository + Send + Sync>,
    pub ledger: Arc<dyn LedgerRepository + Send + Sync>,
    pub quota: Arc<dyn QuotaRepository + Send + Sync>,
    pub redemptions: Arc<dyn RedemptionRepository + Send + Sync>,
}

impl EconomyBackend {
    /// Bind all four repositories to one Postgres pool.
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
            ledger: Arc::new(PostgresLedgerRepository::new(pool.clone())),
            quota: Arc::new(PostgresQuotaRepository::new(pool.clone())),
            redemptions: Arc::new(PostgresRedemptionRepository::new(pool)),
        }
    }
}

/// Tunables and tables. Defaults match the production deployment.
#[derive(Debug, Clone)]
pub struct EconomyConfig {
    /// Deadline for every remote call.
    pub remote_timeout: Duration,
    pub spin_table: PrizeTable,
    pub scratch_table: PrizeTable,
    pub quiz_points_per_correct: i64,
    pub catalog: RewardCatalog,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(3),
            spin_table: PrizeTable::default_spin(),
            scratch_table: PrizeTable::default_scratch(),
            quiz_points_per_correct: 10,
            catalog: RewardCatalog::default_subscriptions(),
        }
    }
}

/// What one earning action produced.
#[derive(Debug, Clone)]
pub struct EarnOutcome {
    /// None when the action earned nothing (losing scratch card,
    /// zero-score quiz); the attempt is still consumed.
    pub entry: Option<LedgerEntry>,
    /// Label of the drawn prize, for game UIs. None for quizzes and tasks.
    pub prize_label: Option<String>,
    pub points_earned: i64,
    /// Fresh post-operation balance.
    pub balance: i64,
    /// Attempts left today after this one.
    pub quota: QuotaStatus,
}

/// Everything that needs the remote store. Absent in offline mode.
struct Online {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    ledger: LedgerService,
    bonus: BonusIssuer,
    redemptions: RedemptionService,
}

/// The facade every game and task screen calls. Composes the quota
/// tracker, prize tables, ledger, bonus issuer and redemption workflow;
/// nothing here holds a lock across a remote call, correctness under
/// concurrent callers comes from the store-side atomic operations.
pub struct EconomyService {
    quota: QuotaTracker,
    online: Option<Online>,
    balances: BalanceCache,
    spin_table: PrizeTable,
    scratch_table: PrizeTable,
    quiz_points_per_correct: i64,
    remote_timeout: Duration,
}

impl EconomyService {
    pub fn new(backend: EconomyBackend, local: Arc<LocalDayStore>, config: EconomyConfig) -> Self {
        let quota = QuotaTracker::new(backend.quota.clone(), local, config.remote_timeout);
        let online = Online {
            accounts: backend.accounts.clone(),
            ledger: LedgerService::new(
                backend.ledger.clone(),
                backend.accounts.clone(),
                config.remote_timeout,
            ),
            bonus: BonusIssuer::new(backend.ledger.clone(), config.remote_timeout),
            redemptions: RedemptionService::new(
                backend.redemptions.clone(),
                config.catalog.clone(),
                config.remote_timeout,
            ),
        };

        Self {
            quota,
            online: Some(online),
            balances: BalanceCache::new(),
            spin_table: config.spin_table,
            scratch_table: config.scratch_table,
            quiz_points_per_correct: config.quiz_points_per_correct,
            remote_timeout: config.remote_timeout,
        }
    }

    /// Degraded mode for running without a configured backend: local
    /// quota questions still work, every operation that moves points is
    /// rejected with [`Error::NotConfigured`].
    pub fn offline(local: Arc<LocalDayStore>, config: EconomyConfig) -> Self {
        Self {
            quota: QuotaTracker::local_only(local),
            online: None,
            balances: BalanceCache::new(),
            spin_table: config.spin_table,
            scratch_table: config.scratch_table,
            quiz_points_per_correct: config.quiz_points_per_correct,
            remote_timeout: config.remote_timeout,
        }
    }

    fn online(&self) -> Result<&Online, Error> {
        self.online.as_ref().ok_or_else(|| {
            Error::NotConfigured(
                "points backend not configured; earning and redemption are disabled".to_string(),
            )
        })
    }

    pub async fn play_spin(&self, account_id: Uuid) -> Result<EarnOutcome, Error> {
        self.play_draw_game(account_id, ActivityKind::Spin, &self.spin_table, sources::SPIN_WIN)
            .await
    }

    pub async fn play_scratch(&self, account_id: Uuid) -> Result<EarnOutcome, Error> {
        self.play_draw_game(
            account_id,
            ActivityKind::Scratch,
            &self.scratch_table,
            sources::SCRATCH_EARN,
        )
        .await
    }

    async fn play_draw_game(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        table: &PrizeTable,
        source: &str,
    ) -> Result<EarnOutcome, Error> {
        let online = self.online()?;

        // Fixed flow order: quota check, draw, record, consume.
        let status = self.quota.remaining(account_id, activity).await;
        if status.remaining <= 0 {
            debug!("{} denied for {}: daily quota exhausted", activity, account_id);
            return Err(Error::QuotaExhausted { activity });
        }

        // ThreadRng is not Send; keep it out of scope before any await.
        let prize = {
            let mut rng = rand::rng();
            table.draw(&mut rng).clone()
        };
        debug!(
            "{} draw for {}: '{}' ({} points)",
            activity, account_id, prize.label, prize.points
        );

        let entry = if prize.points > 0 {
            let description = format!("{} prize: {}", activity, prize.label);
            Some(
                online
                    .ledger
                    .record_earn(account_id, prize.points, Some(source), &description)
                    .await?,
            )
        } else {
            None
        };

        let quota = self.consume_after_write(account_id, activity).await?;
        let balance = self.fetch_account(account_id).await?.points;

        Ok(EarnOutcome {
            entry,
            prize_label: Some(prize.label),
            points_earned: prize.points,
            balance,
            quota,
        })
    }

    pub async fn complete_quiz(
        &self,
        account_id: Uuid,
        correct: u32,
        total: u32,
    ) -> Result<EarnOutcome, Error> {
        let online = self.online()?;
        if correct > total {
            return Err(Error::Parse(format!(
                "quiz score {}/{} is impossible",
                correct, total
            )));
        }

        let status = self.quota.remaining(account_id, ActivityKind::Quiz).await;
        if status.remaining <= 0 {
            debug!("quiz denied for {}: daily quota exhausted", account_id);
            return Err(Error::QuotaExhausted {
                activity: ActivityKind::Quiz,
            });
        }

        let points = i64::from(correct) * self.quiz_points_per_correct;
        let entry = if points > 0 {
            let description = format!("Quiz: {}/{} correct", correct, total);
            Some(
                online
                    .ledger
                    .record_earn(account_id, points, Some(sources::QUIZ_EARN), &description)
                    .await?,
            )
        } else {
            None
        };

        let quota = self.consume_after_write(account_id, ActivityKind::Quiz).await?;
        let balance = self.fetch_account(account_id).await?.points;

        Ok(EarnOutcome {
            entry,
            prize_label: None,
            points_earned: points,
            balance,
            quota,
        })
    }

    /// Social-task earn. Not quota-limited; the amount comes from the task
    /// definition on the caller's side.
    pub async fn complete_task(
        &self,
        account_id: Uuid,
        task_id: &str,
        points: i64,
    ) -> Result<LedgerEntry, Error> {
        let online = self.online()?;
        let source = sources::task(task_id);
        let description = format!("Task {}", task_id);
        let entry = online
            .ledger
            .record_earn(account_id, points, Some(&source), &description)
            .await?;
        self.fetch_account(account_id).await?;
        Ok(entry)
    }

    pub async fn issue_signup_bonus(&self, account_id: Uuid) -> Result<BonusOutcome, Error> {
        let online = self.online()?;
        let outcome = online.bonus.issue_if_missing(account_id).await?;
        if outcome == BonusOutcome::Granted {
            self.fetch_account(account_id).await?;
        }
        Ok(outcome)
    }

    pub async fn redeem(
        &self,
        account_id: Uuid,
        reward_id: &str,
        tier: DurationTier,
        contact: &RedemptionContact,
    ) -> Result<RedemptionRequest, Error> {
        let online = self.online()?;
        let request = online
            .redemptions
            .create(account_id, reward_id, tier, contact)
            .await?;
        self.fetch_account(account_id).await?;
        Ok(request)
    }

    /// Fresh read of the account; refreshes the advisory balance cache.
    pub async fn account(&self, account_id: Uuid) -> Result<Account, Error> {
        self.fetch_account(account_id).await
    }

    pub async fn history(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        self.online()?.ledger.history(account_id).await
    }

    pub async fn redemptions(&self, account_id: Uuid) -> Result<Vec<RedemptionRequest>, Error> {
        self.online()?.redemptions.list_for_account(account_id).await
    }

    pub async fn redemption(&self, redemption_id: Uuid) -> Result<Option<RedemptionRequest>, Error> {
        self.online()?.redemptions.get(redemption_id).await
    }

    /// Conservation check over the account's full ledger.
    pub async fn audit(&self, account_id: Uuid) -> Result<LedgerAudit, Error> {
        self.online()?.ledger.audit(account_id).await
    }

    pub fn catalog(&self) -> Result<&RewardCatalog, Error> {
        Ok(self.online()?.redemptions.catalog())
    }

    pub async fn quota_status(&self, account_id: Uuid, activity: ActivityKind) -> QuotaStatus {
        self.quota.remaining(account_id, activity).await
    }

    /// Last balance this facade saw, if any. May be stale; gated
    /// operations never trust it.
    pub fn cached_balance(&self, account_id: Uuid) -> Option<CachedBalance> {
        self.balances.get(account_id)
    }

    pub fn last_action(&self, account_id: Uuid, activity: ActivityKind) -> Option<DateTime<Utc>> {
        self.quota.last_action(account_id, activity)
    }

    async fn fetch_account(&self, account_id: Uuid) -> Result<Account, Error> {
        let online = self.online()?;
        let account = timeout(self.remote_timeout, online.accounts.get(account_id))
            .await??
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        self.balances
            .put(account.account_id, account.points, account.total_earned);
        Ok(account)
    }

    async fn consume_after_write(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
    ) -> Result<QuotaStatus, Error> {
        match self.quota.consume(account_id, activity).await? {
            QuotaOutcome::Consumed {
                remaining,
                authority,
            } => Ok(QuotaStatus {
                remaining,
                authority,
            }),
            QuotaOutcome::Denied { authority } => {
                // Another session took the last attempt between our check
                // and this consume. The earn is already committed; keep it
                // and report an empty quota.
                warn!(
                    "late quota denial for {} {}; committed earn kept",
                    account_id, activity
                );
                Ok(QuotaStatus {
                    remaining: 0,
                    authority,
                })
            }
        }
    }
}
