// File: pointmill-core/tests/economy_tests.rs

use std::sync::Arc;
use std::time::Duration;

use pointmill_common::models::ledger::sources;
use pointmill_common::models::prize::{PrizeTable, PrizeTableEntry};
use pointmill_common::models::quota::{ActivityKind, QuotaAuthority};
use pointmill_common::models::redemption::{DurationTier, RedemptionContact, RedemptionStatus};
use pointmill_core::cache::LocalDayStore;
use pointmill_core::services::{
    BonusOutcome, EconomyBackend, EconomyConfig, EconomyService, SIGNUP_BONUS_POINTS,
};
use pointmill_core::test_utils::MemoryBackend;
use pointmill_core::Error;

/// A degenerate table that always pays the same prize, so scenario tests
/// stay deterministic without touching the RNG.
fn single_prize(label: &str, points: i64) -> PrizeTable {
    PrizeTable::new(vec![PrizeTableEntry::new(label, points, 100.0)]).unwrap()
}

fn test_config() -> EconomyConfig {
    EconomyConfig {
        remote_timeout: Duration::from_secs(2),
        spin_table: single_prize("50 points", 50),
        scratch_table: single_prize("No prize", 0),
        ..EconomyConfig::default()
    }
}

fn build_economy(backend: &Arc<MemoryBackend>, config: EconomyConfig) -> EconomyService {
    let repos = EconomyBackend {
        accounts: backend.clone(),
        ledger: backend.clone(),
        quota: backend.clone(),
        redemptions: backend.clone(),
    };
    EconomyService::new(repos, Arc::new(LocalDayStore::in_memory()), config)
}

#[tokio::test]
async fn test_signup_spin_redeem_scenario() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("noor@example.com");
    let id = account.account_id;

    // Signup bonus funds the account.
    assert_eq!(economy.issue_signup_bonus(id).await?, BonusOutcome::Granted);
    assert_eq!(economy.account(id).await?.points, SIGNUP_BONUS_POINTS);

    // One spin on the rigged wheel.
    let outcome = economy.play_spin(id).await?;
    assert_eq!(outcome.prize_label.as_deref(), Some("50 points"));
    assert_eq!(outcome.points_earned, 50);
    assert_eq!(outcome.balance, 150);
    assert_eq!(outcome.quota.remaining, 2);
    assert_eq!(outcome.quota.authority, QuotaAuthority::Remote);

    // Redeem a week of streaming for 120.
    let contact = RedemptionContact::new("noor@example.com");
    let request = economy
        .redeem(id, "stream-basic", DurationTier::OneWeek, &contact)
        .await?;
    assert_eq!(request.status, RedemptionStatus::Pending);
    assert_eq!(request.points_cost, 120);

    // 100 + 50 - 120 = 30, and the books balance.
    assert_eq!(economy.account(id).await?.points, 30);
    let audit = economy.audit(id).await?;
    assert!(audit.is_consistent());
    assert_eq!(audit.total_earned, 150);

    assert_eq!(economy.history(id).await?.len(), 3);
    assert_eq!(economy.redemptions(id).await?.len(), 1);
    assert_eq!(economy.cached_balance(id).unwrap().points, 30);
    Ok(())
}

#[tokio::test]
async fn test_fourth_spin_of_the_day_is_blocked() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("pia@example.com");
    let id = account.account_id;

    for expected_remaining in [2, 1, 0] {
        let outcome = economy.play_spin(id).await?;
        assert_eq!(outcome.quota.remaining, expected_remaining);
    }

    let err = economy.play_spin(id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::QuotaExhausted { activity: ActivityKind::Spin }
    ));

    // The denial wrote nothing.
    assert_eq!(backend.entries_for(id).len(), 3);
    assert_eq!(economy.account(id).await?.points, 150);

    // Scratch attempts are not affected by the spent spin quota.
    assert_eq!(economy.quota_status(id, ActivityKind::Scratch).await.remaining, 3);
    Ok(())
}

#[tokio::test]
async fn test_losing_scratch_consumes_the_attempt_without_a_write() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("ben@example.com");
    let id = account.account_id;

    let outcome = economy.play_scratch(id).await?;
    assert!(outcome.entry.is_none());
    assert_eq!(outcome.prize_label.as_deref(), Some("No prize"));
    assert_eq!(outcome.points_earned, 0);
    assert_eq!(outcome.balance, 0);
    assert_eq!(outcome.quota.remaining, 2);

    // No ledger movement, but the attempt is gone.
    assert!(backend.entries_for(id).is_empty());
    assert_eq!(economy.quota_status(id, ActivityKind::Scratch).await.remaining, 2);
    assert!(economy.last_action(id, ActivityKind::Scratch).is_some());
    Ok(())
}

#[tokio::test]
async fn test_quiz_points_scale_with_correct_answers() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("dara@example.com");
    let id = account.account_id;

    let outcome = economy.complete_quiz(id, 3, 5).await?;
    assert_eq!(outcome.points_earned, 30);
    assert!(outcome.prize_label.is_none());
    let entry = outcome.entry.unwrap();
    assert_eq!(entry.source.as_deref(), Some(sources::QUIZ_EARN));
    assert_eq!(entry.description, "Quiz: 3/5 correct");

    // A zero-score quiz still burns the attempt.
    let blank = economy.complete_quiz(id, 0, 5).await?;
    assert!(blank.entry.is_none());
    assert_eq!(blank.points_earned, 0);
    assert_eq!(blank.quota.remaining, 1);

    // An impossible score is rejected before any quota or ledger touch.
    let err = economy.complete_quiz(id, 6, 5).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert_eq!(economy.quota_status(id, ActivityKind::Quiz).await.remaining, 1);
    assert_eq!(economy.account(id).await?.points, 30);
    Ok(())
}

#[tokio::test]
async fn test_task_earns_are_not_quota_limited() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("kofi@example.com");
    let id = account.account_id;

    for _ in 0..5 {
        let entry = economy.complete_task(id, "follow-x", 20).await?;
        assert_eq!(entry.source.as_deref(), Some("task:follow-x"));
        assert_eq!(entry.description, "Task follow-x");
    }

    assert_eq!(economy.account(id).await?.points, 100);
    assert_eq!(backend.entries_for(id).len(), 5);

    // Tasks draw on no activity allowance.
    for activity in ActivityKind::ALL {
        assert_eq!(economy.quota_status(id, activity).await.remaining, 3);
    }
    Ok(())
}

#[tokio::test]
async fn test_offline_mode_answers_quota_and_rejects_the_rest() {
    let economy = EconomyService::offline(Arc::new(LocalDayStore::in_memory()), test_config());
    let id = uuid::Uuid::new_v4();

    let status = economy.quota_status(id, ActivityKind::Spin).await;
    assert_eq!(status.remaining, 3);
    assert_eq!(status.authority, QuotaAuthority::LocalFallback);

    assert!(matches!(economy.play_spin(id).await, Err(Error::NotConfigured(_))));
    assert!(matches!(
        economy.issue_signup_bonus(id).await,
        Err(Error::NotConfigured(_))
    ));
    let contact = RedemptionContact::new("offline@example.com");
    assert!(matches!(
        economy.redeem(id, "stream-basic", DurationTier::OneWeek, &contact).await,
        Err(Error::NotConfigured(_))
    ));
    assert!(matches!(economy.history(id).await, Err(Error::NotConfigured(_))));
    assert!(matches!(economy.catalog(), Err(Error::NotConfigured(_))));
    assert!(economy.cached_balance(id).is_none());
}

#[tokio::test]
async fn test_account_reads_refresh_the_balance_cache() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let economy = build_economy(&backend, test_config());
    let account = backend.seed_account("yara@example.com");
    let id = account.account_id;

    assert!(economy.cached_balance(id).is_none());

    economy.account(id).await?;
    assert_eq!(economy.cached_balance(id).unwrap().points, 0);

    economy.play_spin(id).await?;
    let cached = economy.cached_balance(id).unwrap();
    assert_eq!(cached.points, 50);
    assert_eq!(cached.total_earned, 50);

    let missing = economy.account(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, Error::NotFound(_)));
    Ok(())
}
