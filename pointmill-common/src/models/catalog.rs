// File: pointmill-common/src/models/catalog.rs

use serde::{Deserialize, Serialize};

use crate::models::redemption::DurationTier;

/// One redeemable reward at one duration tier. The same `reward_id` can
/// appear under several tiers with different costs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewardOption {
    pub reward_id: String,
    pub reward_name: String,
    pub tier: DurationTier,
    pub points_cost: i64,
}

impl RewardOption {
    pub fn new(reward_id: &str, reward_name: &str, tier: DurationTier, points_cost: i64) -> Self {
        Self {
            reward_id: reward_id.to_string(),
            reward_name: reward_name.to_string(),
            tier,
            points_cost,
        }
    }

    /// Ledger description for the debit this option creates.
    pub fn debit_description(&self) -> String {
        format!("Redeemed {} ({})", self.reward_name, self.tier)
    }
}

/// The set of rewards currently offered. Carried in configuration so a
/// deployment can swap offerings without touching the engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewardCatalog {
    options: Vec<RewardOption>,
}

impl RewardCatalog {
    pub fn new(options: Vec<RewardOption>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &[RewardOption] {
        &self.options
    }

    pub fn find(&self, reward_id: &str, tier: DurationTier) -> Option<&RewardOption> {
        self.options
            .iter()
            .find(|o| o.reward_id == reward_id && o.tier == tier)
    }

    /// The stock subscription offering.
    pub fn default_subscriptions() -> Self {
        Self::new(vec![
            RewardOption::new("stream-basic", "Streaming Basic", DurationTier::OneWeek, 120),
            RewardOption::new("stream-basic", "Streaming Basic", DurationTier::OneMonth, 450),
            RewardOption::new("stream-premium", "Streaming Premium", DurationTier::OneMonth, 800),
            RewardOption::new("stream-premium", "Streaming Premium", DurationTier::ThreeMonths, 2200),
            RewardOption::new("music-plus", "Music Plus", DurationTier::OneWeek, 150),
            RewardOption::new("music-plus", "Music Plus", DurationTier::OneMonth, 550),
            RewardOption::new("game-pass", "Game Pass", DurationTier::OneMonth, 1000),
            RewardOption::new("game-pass", "Game Pass", DurationTier::TwelveMonths, 9500),
        ])
    }
}
