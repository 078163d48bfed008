// File: pointmill-core/tests/bonus_tests.rs

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use pointmill_common::models::ledger::sources;
use pointmill_common::traits::repository_traits::AccountRepository;
use pointmill_core::services::{BonusIssuer, BonusOutcome, SIGNUP_BONUS_POINTS};
use pointmill_core::test_utils::MemoryBackend;
use pointmill_core::Error;

fn build_issuer(backend: &Arc<MemoryBackend>) -> BonusIssuer {
    BonusIssuer::new(backend.clone(), Duration::from_secs(2))
}

fn signup_entry_count(backend: &MemoryBackend, account_id: Uuid) -> usize {
    backend
        .entries_for(account_id)
        .iter()
        .filter(|e| e.source.as_deref() == Some(sources::SIGNUP))
        .count()
}

#[tokio::test]
async fn test_first_trigger_grants_the_bonus() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let issuer = build_issuer(&backend);
    let account = backend.seed_account("mira@example.com");

    let outcome = issuer.issue_if_missing(account.account_id).await?;
    assert_eq!(outcome, BonusOutcome::Granted);

    let stored = backend.get(account.account_id).await?.unwrap();
    assert_eq!(stored.points, SIGNUP_BONUS_POINTS);
    assert_eq!(stored.total_earned, SIGNUP_BONUS_POINTS);
    assert_eq!(signup_entry_count(&backend, account.account_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_repeat_triggers_grant_nothing_further() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let issuer = build_issuer(&backend);
    let account = backend.seed_account("kai@example.com");

    assert_eq!(issuer.issue_if_missing(account.account_id).await?, BonusOutcome::Granted);
    assert_eq!(issuer.issue_if_missing(account.account_id).await?, BonusOutcome::AlreadyGranted);
    assert_eq!(issuer.issue_if_missing(account.account_id).await?, BonusOutcome::AlreadyGranted);

    let stored = backend.get(account.account_id).await?.unwrap();
    assert_eq!(stored.points, SIGNUP_BONUS_POINTS);
    assert_eq!(signup_entry_count(&backend, account.account_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_triggers_grant_exactly_once() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let issuer = build_issuer(&backend);
    let account = backend.seed_account("ren@example.com");

    let (a, b, c) = tokio::join!(
        issuer.issue_if_missing(account.account_id),
        issuer.issue_if_missing(account.account_id),
        issuer.issue_if_missing(account.account_id),
    );

    let granted = [a?, b?, c?]
        .iter()
        .filter(|o| **o == BonusOutcome::Granted)
        .count();
    assert_eq!(granted, 1);

    let stored = backend.get(account.account_id).await?.unwrap();
    assert_eq!(stored.points, SIGNUP_BONUS_POINTS);
    assert_eq!(signup_entry_count(&backend, account.account_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_defers_and_retry_grants() -> Result<(), Error> {
    let backend = Arc::new(MemoryBackend::new());
    let issuer = build_issuer(&backend);
    let account = backend.seed_account("noor@example.com");

    backend.set_unreachable(true);
    assert_eq!(issuer.issue_if_missing(account.account_id).await?, BonusOutcome::Deferred);

    backend.set_unreachable(false);
    assert_eq!(signup_entry_count(&backend, account.account_id), 0);

    // The retry re-enters the same idempotent grant.
    assert_eq!(issuer.issue_if_missing(account.account_id).await?, BonusOutcome::Granted);
    assert_eq!(signup_entry_count(&backend, account.account_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_account_is_a_hard_error() {
    let backend = Arc::new(MemoryBackend::new());
    let issuer = build_issuer(&backend);

    let err = issuer.issue_if_missing(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!err.is_retryable());
}
