// File: pointmill-core/tests/fallback_tests.rs
//
// Failure-path coverage with scripted repositories: late quota denials,
// deferred bonuses, and timeouts demoting quota answers to the local tier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use pointmill_common::models::prize::{PrizeTable, PrizeTableEntry};
use pointmill_common::models::quota::{ActivityKind, QuotaAuthority, QuotaOutcome};
use pointmill_common::traits::repository_traits::{LedgerRepository, QuotaRepository};
use pointmill_core::cache::LocalDayStore;
use pointmill_core::services::{
    BonusIssuer, BonusOutcome, EconomyBackend, EconomyConfig, EconomyService, QuotaTracker,
};
use pointmill_core::test_utils::MemoryBackend;
use pointmill_core::Error;

mock! {
    QuotaRepo {}
    #[async_trait]
    impl QuotaRepository for QuotaRepo {
        async fn used(&self, account_id: Uuid, activity: ActivityKind, day_key: &str) -> Result<i64, Error>;
        async fn increment_with_cap(&self, account_id: Uuid, activity: ActivityKind, day_key: &str, cap: i64) -> Result<Option<i64>, Error>;
    }
}

mock! {
    LedgerRepo {}
    #[async_trait]
    impl LedgerRepository for LedgerRepo {
        async fn record(&self, entry: &pointmill_common::models::ledger::LedgerEntry) -> Result<(), Error>;
        async fn has_entry_with_source(&self, account_id: Uuid, source: &str) -> Result<bool, Error>;
        async fn grant_signup_bonus_if_missing(&self, account_id: Uuid, amount: i64, description: &str) -> Result<bool, Error>;
        async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<pointmill_common::models::ledger::LedgerEntry>, Error>;
    }
}

/// Answers correctly, but slower than any sane deadline.
struct SlowQuotaRepo;

#[async_trait]
impl QuotaRepository for SlowQuotaRepo {
    async fn used(
        &self,
        _account_id: Uuid,
        _activity: ActivityKind,
        _day_key: &str,
    ) -> Result<i64, Error> {
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok(0)
    }

    async fn increment_with_cap(
        &self,
        _account_id: Uuid,
        _activity: ActivityKind,
        _day_key: &str,
        _cap: i64,
    ) -> Result<Option<i64>, Error> {
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok(Some(1))
    }
}

fn single_prize(label: &str, points: i64) -> PrizeTable {
    PrizeTable::new(vec![PrizeTableEntry::new(label, points, 100.0)]).unwrap()
}

#[tokio::test]
async fn test_late_quota_denial_keeps_the_committed_earn() -> Result<(), Error> {
    // The pre-check sees a free attempt, then another session wins the
    // race and the consume comes back denied. The earn must stay.
    let mut mock_quota = MockQuotaRepo::new();
    mock_quota.expect_used().times(1).returning(|_, _, _| Ok(0));
    mock_quota
        .expect_increment_with_cap()
        .times(1)
        .returning(|_, _, _, _| Ok(None));

    let backend = Arc::new(MemoryBackend::new());
    let repos = EconomyBackend {
        accounts: backend.clone(),
        ledger: backend.clone(),
        quota: Arc::new(mock_quota),
        redemptions: backend.clone(),
    };
    let config = EconomyConfig {
        remote_timeout: Duration::from_secs(2),
        spin_table: single_prize("50 points", 50),
        ..EconomyConfig::default()
    };
    let economy = EconomyService::new(repos, Arc::new(LocalDayStore::in_memory()), config);
    let account = backend.seed_account("race@example.com");

    let outcome = economy.play_spin(account.account_id).await?;
    assert!(outcome.entry.is_some());
    assert_eq!(outcome.points_earned, 50);
    assert_eq!(outcome.balance, 50);
    assert_eq!(outcome.quota.remaining, 0);
    assert_eq!(outcome.quota.authority, QuotaAuthority::Remote);

    assert_eq!(backend.entries_for(account.account_id).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_check_defers_the_bonus() -> Result<(), Error> {
    let mut mock_ledger = MockLedgerRepo::new();
    mock_ledger
        .expect_has_entry_with_source()
        .times(1)
        .returning(|_, _| Err(Error::Database(sqlx::Error::PoolTimedOut)));
    // No grant expectation: reaching the grant after a failed check
    // would panic the mock.

    let issuer = BonusIssuer::new(Arc::new(mock_ledger), Duration::from_secs(1));
    let outcome = issuer.issue_if_missing(Uuid::new_v4()).await?;
    assert_eq!(outcome, BonusOutcome::Deferred);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_grant_defers_the_bonus() -> Result<(), Error> {
    let mut mock_ledger = MockLedgerRepo::new();
    mock_ledger
        .expect_has_entry_with_source()
        .times(1)
        .returning(|_, _| Ok(false));
    mock_ledger
        .expect_grant_signup_bonus_if_missing()
        .times(1)
        .returning(|_, _, _| Err(Error::Database(sqlx::Error::PoolTimedOut)));

    let issuer = BonusIssuer::new(Arc::new(mock_ledger), Duration::from_secs(1));
    let outcome = issuer.issue_if_missing(Uuid::new_v4()).await?;
    assert_eq!(outcome, BonusOutcome::Deferred);
    Ok(())
}

#[tokio::test]
async fn test_slow_remote_demotes_quota_answers_to_local() -> Result<(), Error> {
    let local = Arc::new(LocalDayStore::in_memory());
    let tracker = QuotaTracker::new(Arc::new(SlowQuotaRepo), local, Duration::from_millis(10));
    let account_id = Uuid::new_v4();

    let status = tracker.remaining(account_id, ActivityKind::Spin).await;
    assert_eq!(status.remaining, 3);
    assert_eq!(status.authority, QuotaAuthority::LocalFallback);

    // Consumes time out on the remote tier and land on the local counter,
    // which still enforces the cap.
    for expected_remaining in [2, 1, 0] {
        let outcome = tracker.consume(account_id, ActivityKind::Spin).await?;
        assert!(matches!(
            outcome,
            QuotaOutcome::Consumed {
                remaining,
                authority: QuotaAuthority::LocalFallback,
            } if remaining == expected_remaining
        ));
    }
    let fourth = tracker.consume(account_id, ActivityKind::Spin).await?;
    assert!(matches!(
        fourth,
        QuotaOutcome::Denied { authority: QuotaAuthority::LocalFallback }
    ));
    Ok(())
}

#[tokio::test]
async fn test_hard_store_errors_propagate_from_consume() {
    let mut mock_quota = MockQuotaRepo::new();
    mock_quota
        .expect_increment_with_cap()
        .times(1)
        .returning(|_, _, _, _| Err(Error::Parse("corrupt counter row".to_string())));

    let tracker = QuotaTracker::new(
        Arc::new(mock_quota),
        Arc::new(LocalDayStore::in_memory()),
        Duration::from_secs(1),
    );

    let err = tracker
        .consume(Uuid::new_v4(), ActivityKind::Quiz)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(!err.is_retryable());
}
