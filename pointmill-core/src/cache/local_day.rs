// File: src/cache/local_day.rs

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pointmill_common::error::Error;
use pointmill_common::models::quota::ActivityKind;

/// Client-local fallback for the quota system: day-keyed counters plus the
/// last action time per activity. Best effort only; whenever the remote
/// counter answers, this one is ignored (the two are never merged).
pub struct LocalDayStore {
    counters: DashMap<String, i64>,
    last_actions: DashMap<String, DateTime<Utc>>,
    state_path: Option<PathBuf>,
}

/// On-disk shape of the store, written as pretty JSON after each change.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    counters: HashMap<String, i64>,
    last_actions: HashMap<String, DateTime<Utc>>,
}

impl LocalDayStore {
    /// Volatile store, used in tests and in deployments that accept losing
    /// the fallback counters on restart.
    pub fn in_memory() -> Self {
        Self {
            counters: DashMap::new(),
            last_actions: DashMap::new(),
            state_path: None,
        }
    }

    /// Store backed by a JSON state file. Stale day keys are loaded but
    /// never consulted again; they are dropped on the next flush of a new
    /// day's first write.
    pub fn with_state_file(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let store = Self {
            counters: DashMap::new(),
            last_actions: DashMap::new(),
            state_path: Some(path.clone()),
        };
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let state: PersistedState = serde_json::from_str(&raw)?;
            for (key, value) in state.counters {
                store.counters.insert(key, value);
            }
            for (key, value) in state.last_actions {
                store.last_actions.insert(key, value);
            }
        }
        Ok(store)
    }

    /// Default state file under the platform data dir.
    pub fn default_state_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("pointmill").join("day_state.json"))
    }

    fn counter_key(account_id: Uuid, activity: ActivityKind, day_key: &str) -> String {
        format!("{}|{}|{}", account_id, activity, day_key)
    }

    fn action_key(account_id: Uuid, activity: ActivityKind) -> String {
        format!("{}|{}", account_id, activity)
    }

    pub fn used(&self, account_id: Uuid, activity: ActivityKind, day_key: &str) -> i64 {
        self.counters
            .get(&Self::counter_key(account_id, activity, day_key))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Local twin of the remote capped increment: returns the new count,
    /// or None once the cap is reached.
    pub fn increment_with_cap(
        &self,
        account_id: Uuid,
        activity: ActivityKind,
        day_key: &str,
        cap: i64,
    ) -> Result<Option<i64>, Error> {
        if cap <= 0 {
            return Ok(None);
        }

        let key = Self::counter_key(account_id, activity, day_key);
        let new_count = {
            let mut entry = self.counters.entry(key).or_insert(0);
            if *entry >= cap {
                return Ok(None);
            }
            *entry += 1;
            *entry
        };

        self.note_action(account_id, activity);
        self.flush(day_key)?;
        Ok(Some(new_count))
    }

    /// Record that an attempt happened now, without touching counters.
    /// Used when the remote counter did the actual bookkeeping.
    pub fn note_action(&self, account_id: Uuid, activity: ActivityKind) {
        self.last_actions
            .insert(Self::action_key(account_id, activity), Utc::now());
    }

    pub fn last_action(&self, account_id: Uuid, activity: ActivityKind) -> Option<DateTime<Utc>> {
        self.last_actions
            .get(&Self::action_key(account_id, activity))
            .map(|v| *v)
    }

    /// Write current state to the state file, dropping counters whose day
    /// key is not the one being written.
    fn flush(&self, current_day_key: &str) -> Result<(), Error> {
        let path = match &self.state_path {
            Some(p) => p,
            None => return Ok(()),
        };

        let suffix = format!("|{}", current_day_key);
        let state = PersistedState {
            counters: self
                .counters
                .iter()
                .filter(|e| e.key().ends_with(&suffix))
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            last_actions: self
                .last_actions
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }
}
