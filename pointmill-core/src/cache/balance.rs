// File: src/cache/balance.rs

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Last balance the engine saw for an account. Advisory only; the store
/// decides every gated operation, so a stale value here can never spend
/// points that are not there.
#[derive(Debug, Clone, Copy)]
pub struct CachedBalance {
    pub points: i64,
    pub total_earned: i64,
    pub as_of: DateTime<Utc>,
}

#[derive(Default)]
pub struct BalanceCache {
    entries: DashMap<Uuid, CachedBalance>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn put(&self, account_id: Uuid, points: i64, total_earned: i64) {
        self.entries.insert(
            account_id,
            CachedBalance {
                points,
                total_earned,
                as_of: Utc::now(),
            },
        );
    }

    pub fn get(&self, account_id: Uuid) -> Option<CachedBalance> {
        self.entries.get(&account_id).map(|e| *e.value())
    }

    pub fn invalidate(&self, account_id: Uuid) {
        self.entries.remove(&account_id);
    }
}
