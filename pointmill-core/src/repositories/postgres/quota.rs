// src/repositories/postgres/quota.rs

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::quota::ActivityKind;
use pointmill_common::traits::repository_traits::QuotaRepository;

pub struct PostgresQuotaRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresQuotaRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuotaRepository for PostgresQuotaRepository {
    async fn used(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
    ) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            SELECT used
            FROM daily_quota
            WHERE account_id = $1 AND activity = $2 AND day_key = $3
            "#,
        )
            .bind(account_id)
            .bind(activity)
            .bind(day_key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(r.try_get::<i64, _>("used")?),
            None => Ok(0),
        }
    }

    async fn increment_with_cap(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
        cap: i64,
    ) -> Result<Option<i64>, Error> {
        if cap <= 0 {
            return Ok(None);
        }

        // Single statement so two sessions can never both take the last
        // attempt: the upsert only lands while used < cap, and a capped
        // counter returns no row.
        let row = sqlx::query(
            r#"
            INSERT INTO daily_quota (account_id, activity, day_key, used)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (account_id, activity, day_key) DO UPDATE
                SET used = daily_quota.used + 1
                WHERE daily_quota.used < $4
            RETURNING used
            "#,
        )
            .bind(account_id)
            .bind(activity)
            .bind(day_key)
            .bind(cap)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.try_get::<i64, _>("used")?)),
            None => Ok(None),
        }
    }
}
