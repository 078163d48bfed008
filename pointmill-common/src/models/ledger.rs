// File: pointmill-common/src/models/ledger.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known `source` tags the engine writes. The signup tag doubles as
/// the idempotency key for the one-time bonus, so nothing else may use it.
pub mod sources {
    pub const SIGNUP: &str = "signup";
    pub const SPIN_WIN: &str = "spin_win";
    pub const SCRATCH_EARN: &str = "scratch_earn";
    pub const QUIZ_EARN: &str = "quiz_earn";
    pub const REDEMPTION: &str = "redemption";
    pub const TASK_PREFIX: &str = "task:";

    pub fn task(task_id: &str) -> String {
        format!("{}{}", TASK_PREFIX, task_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Earn,
    Redeem,
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEntryKind::Earn => write!(f, "earn"),
            LedgerEntryKind::Redeem => write!(f, "redeem"),
        }
    }
}

impl FromStr for LedgerEntryKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earn" => Ok(LedgerEntryKind::Earn),
            "redeem" => Ok(LedgerEntryKind::Redeem),
            _ => Err(format!("Unknown ledger entry kind: {}", s)),
        }
    }
}

/// Append-only record of one balance movement. `amount` is always
/// positive; the kind decides the sign of its effect on the balance.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub kind: LedgerEntryKind,
    pub amount: i64,
    pub description: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        account_id: Uuid,
        kind: LedgerEntryKind,
        amount: i64,
        source: Option<&str>,
        description: &str,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            description: description.to_string(),
            source: source.map(String::from),
            created_at: Utc::now(),
        }
    }

    /// Signed contribution of this entry to the spendable balance.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            LedgerEntryKind::Earn => self.amount,
            LedgerEntryKind::Redeem => -self.amount,
        }
    }
}
