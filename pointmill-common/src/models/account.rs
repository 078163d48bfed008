use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One participant in the points economy. `points` is the spendable
/// balance; `total_earned` only ever grows and is not reduced by
/// redemptions. Both columns are maintained by ledger writes, never
/// written directly.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub points: i64,
    pub total_earned: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: &str, display_name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            account_id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(String::from),
            points: 0,
            total_earned: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
