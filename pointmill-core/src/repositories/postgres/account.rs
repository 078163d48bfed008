// src/repositories/postgres/account.rs

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::account::Account;
use pointmill_common::traits::repository_traits::AccountRepository;

pub struct PostgresAccountRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: &Account) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id, email, display_name, points, total_earned, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(account.account_id)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.points)
            .bind(account.total_earned)
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id,
                   email,
                   display_name,
                   points,
                   total_earned,
                   created_at,
                   updated_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
