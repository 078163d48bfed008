// src/repositories/postgres/redemption.rs

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::catalog::RewardOption;
use pointmill_common::models::ledger::{sources, LedgerEntry, LedgerEntryKind};
use pointmill_common::models::redemption::{RedemptionContact, RedemptionRequest};
use pointmill_common::traits::repository_traits::RedemptionRepository;

pub struct PostgresRedemptionRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRedemptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RedemptionRepository for PostgresRedemptionRepository {
    async fn create(
        &self,
        account_id: Uuid,
        option: &RewardOption,
        contact: &RedemptionContact,
    ) -> Result<RedemptionRequest, Error> {
        let mut tx = self.pool.begin().await?;

        // Row lock makes balance check, debit and request insert one unit;
        // a concurrent redemption waits here and re-reads the new balance.
        let row = sqlx::query(
            r#"
            SELECT points
            FROM accounts
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;

        let balance: i64 = match row {
            Some(r) => r.try_get("points")?,
            None => {
                tx.rollback().await?;
                return Err(Error::NotFound(format!("account {}", account_id)));
            }
        };

        if balance < option.points_cost {
            tx.rollback().await?;
            return Err(Error::InsufficientPoints {
                balance,
                required: option.points_cost,
            });
        }

        let request = RedemptionRequest::new(account_id, option, contact);
        let debit = LedgerEntry::new(
            account_id,
            LedgerEntryKind::Redeem,
            option.points_cost,
            Some(sources::REDEMPTION),
            &option.debit_description(),
        );

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, account_id, kind, amount, description, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(debit.entry_id)
            .bind(debit.account_id)
            .bind(debit.kind)
            .bind(debit.amount)
            .bind(&debit.description)
            .bind(&debit.source)
            .bind(debit.created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE accounts
            SET points = points - $1,
                updated_at = $2
            WHERE account_id = $3
            "#,
        )
            .bind(option.points_cost)
            .bind(request.created_at)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO redemption_requests (
                redemption_id, account_id, reward_id, reward_name, tier,
                points_cost, status, contact_email, country, notes,
                activation_code, instructions, expires_at, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
            .bind(request.redemption_id)
            .bind(request.account_id)
            .bind(&request.reward_id)
            .bind(&request.reward_name)
            .bind(request.tier)
            .bind(request.points_cost)
            .bind(request.status)
            .bind(&request.contact_email)
            .bind(&request.country)
            .bind(&request.notes)
            .bind(&request.activation_code)
            .bind(&request.instructions)
            .bind(request.expires_at)
            .bind(request.created_at)
            .bind(request.completed_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn get(&self, redemption_id: Uuid) -> Result<Option<RedemptionRequest>, Error> {
        let row = sqlx::query_as::<_, RedemptionRequest>(
            r#"
            SELECT redemption_id,
                   account_id,
                   reward_id,
                   reward_name,
                   tier,
                   points_cost,
                   status,
                   contact_email,
                   country,
                   notes,
                   activation_code,
                   instructions,
                   expires_at,
                   created_at,
                   completed_at
            FROM redemption_requests
            WHERE redemption_id = $1
            "#,
        )
            .bind(redemption_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<RedemptionRequest>, Error> {
        let rows = sqlx::query_as::<_, RedemptionRequest>(
            r#"
            SELECT redemption_id,
                   account_id,
                   reward_id,
                   reward_name,
                   tier,
                   points_cost,
                   status,
                   contact_email,
                   country,
                   notes,
                   activation_code,
                   instructions,
                   expires_at,
                   created_at,
                   completed_at
            FROM redemption_requests
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
