// File: pointmill-common/src/models/redemption.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::catalog::RewardOption;

/// Subscription length a reward is redeemed for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
pub enum DurationTier {
    OneWeek,
    OneMonth,
    ThreeMonths,
    TwelveMonths,
}

impl fmt::Display for DurationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationTier::OneWeek => write!(f, "one_week"),
            DurationTier::OneMonth => write!(f, "one_month"),
            DurationTier::ThreeMonths => write!(f, "three_months"),
            DurationTier::TwelveMonths => write!(f, "twelve_months"),
        }
    }
}

impl FromStr for DurationTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "one_week" => Ok(DurationTier::OneWeek),
            "one_month" => Ok(DurationTier::OneMonth),
            "three_months" => Ok(DurationTier::ThreeMonths),
            "twelve_months" => Ok(DurationTier::TwelveMonths),
            _ => Err(format!("Unknown duration tier: {}", s)),
        }
    }
}

/// Lifecycle of a redemption request. Points are debited when the request
/// is created; later transitions never move points on their own.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RedemptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RedemptionStatus::Completed | RedemptionStatus::Failed | RedemptionStatus::Cancelled
        )
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedemptionStatus::Pending => write!(f, "pending"),
            RedemptionStatus::Processing => write!(f, "processing"),
            RedemptionStatus::Completed => write!(f, "completed"),
            RedemptionStatus::Failed => write!(f, "failed"),
            RedemptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for RedemptionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RedemptionStatus::Pending),
            "processing" => Ok(RedemptionStatus::Processing),
            "completed" => Ok(RedemptionStatus::Completed),
            "failed" => Ok(RedemptionStatus::Failed),
            "cancelled" => Ok(RedemptionStatus::Cancelled),
            _ => Err(format!("Unknown redemption status: {}", s)),
        }
    }
}

/// Delivery details collected from the user at redemption time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RedemptionContact {
    pub email: String,
    pub country: Option<String>,
    pub notes: Option<String>,
}

impl RedemptionContact {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            country: None,
            notes: None,
        }
    }
}

/// One redemption of points for a reward. Fulfillment fields stay empty
/// until an external process completes the request.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct RedemptionRequest {
    pub redemption_id: Uuid,
    pub account_id: Uuid,
    pub reward_id: String,
    pub reward_name: String,
    pub tier: DurationTier,
    pub points_cost: i64,
    pub status: RedemptionStatus,
    pub contact_email: String,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub activation_code: Option<String>,
    pub instructions: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RedemptionRequest {
    pub fn new(account_id: Uuid, option: &RewardOption, contact: &RedemptionContact) -> Self {
        Self {
            redemption_id: Uuid::new_v4(),
            account_id,
            reward_id: option.reward_id.clone(),
            reward_name: option.reward_name.clone(),
            tier: option.tier,
            points_cost: option.points_cost,
            status: RedemptionStatus::Pending,
            contact_email: contact.email.clone(),
            country: contact.country.clone(),
            notes: contact.notes.clone(),
            activation_code: None,
            instructions: None,
            expires_at: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        let all = [
            RedemptionStatus::Pending,
            RedemptionStatus::Processing,
            RedemptionStatus::Completed,
            RedemptionStatus::Failed,
            RedemptionStatus::Cancelled,
        ];
        for status in all {
            assert_eq!(status.to_string().parse::<RedemptionStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<RedemptionStatus>().is_err());
    }

    #[test]
    fn only_settled_states_are_terminal() {
        assert!(!RedemptionStatus::Pending.is_terminal());
        assert!(!RedemptionStatus::Processing.is_terminal());
        assert!(RedemptionStatus::Completed.is_terminal());
        assert!(RedemptionStatus::Failed.is_terminal());
        assert!(RedemptionStatus::Cancelled.is_terminal());
    }
}
