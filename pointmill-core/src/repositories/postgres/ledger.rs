// src/repositories/postgres/ledger.rs

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::ledger::{sources, LedgerEntry, LedgerEntryKind};
use pointmill_common::traits::repository_traits::LedgerRepository;

pub struct PostgresLedgerRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresLedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn record(&self, entry: &LedgerEntry) -> Result<(), Error> {
        // Entry insert and balance update share a transaction. The
        // accounts CHECK (points >= 0) turns an uncovered debit into a
        // rollback of both statements.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, account_id, kind, amount, description, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(entry.entry_id)
            .bind(entry.account_id)
            .bind(entry.kind)
            .bind(entry.amount)
            .bind(&entry.description)
            .bind(&entry.source)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;

        let (points_delta, earned_delta) = match entry.kind {
            LedgerEntryKind::Earn => (entry.amount, entry.amount),
            LedgerEntryKind::Redeem => (-entry.amount, 0),
        };

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET points = points + $1,
                total_earned = total_earned + $2,
                updated_at = $3
            WHERE account_id = $4
            "#,
        )
            .bind(points_delta)
            .bind(earned_delta)
            .bind(entry.created_at)
            .bind(entry.account_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("account {}", entry.account_id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn has_entry_with_source(&self, account_id: Uuid, source: &str) -> Result<bool, Error> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS present
            FROM ledger_entries
            WHERE account_id = $1 AND source = $2
            LIMIT 1
            "#,
        )
            .bind(account_id)
            .bind(source)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn grant_signup_bonus_if_missing(
        &self,
        account_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<bool, Error> {
        let mut tx = self.pool.begin().await?;

        // The partial unique index on (account_id) WHERE source = 'signup'
        // arbitrates concurrent grants; losers insert nothing.
        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, account_id, kind, amount, description, source, created_at
            )
            VALUES ($1, $2, 'earn', $3, $4, $5, $6)
            ON CONFLICT (account_id) WHERE source = 'signup' DO NOTHING
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(amount)
            .bind(description)
            .bind(sources::SIGNUP)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET points = points + $1,
                total_earned = total_earned + $1,
                updated_at = $2
            WHERE account_id = $3
            "#,
        )
            .bind(amount)
            .bind(Utc::now())
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("account {}", account_id)));
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT entry_id,
                   account_id,
                   kind,
                   amount,
                   description,
                   source,
                   created_at
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
