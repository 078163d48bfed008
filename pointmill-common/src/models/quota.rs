// File: pointmill-common/src/models/quota.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The quota-limited earning activities.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum ActivityKind {
    Spin,
    Scratch,
    Quiz,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Spin,
        ActivityKind::Scratch,
        ActivityKind::Quiz,
    ];

    /// Attempts allowed per account per calendar day.
    pub fn daily_allowance(&self) -> i64 {
        match self {
            ActivityKind::Spin | ActivityKind::Scratch | ActivityKind::Quiz => 3,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Spin => write!(f, "spin"),
            ActivityKind::Scratch => write!(f, "scratch"),
            ActivityKind::Quiz => write!(f, "quiz"),
        }
    }
}

impl FromStr for ActivityKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spin" => Ok(ActivityKind::Spin),
            "scratch" => Ok(ActivityKind::Scratch),
            "quiz" => Ok(ActivityKind::Quiz),
            _ => Err(format!("Unknown activity kind: {}", s)),
        }
    }
}

/// One day-partitioned usage counter row. A new day means a new
/// `day_key`, so counters reset without any scheduled job.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct DailyQuotaCounter {
    pub account_id: Uuid,
    pub activity: ActivityKind,
    pub day_key: String,
    pub used: i64,
}

/// Which tier of the quota system answered.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub enum QuotaAuthority {
    Remote,
    LocalFallback,
}

/// Snapshot answer to "how many attempts are left today".
#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub remaining: i64,
    pub authority: QuotaAuthority,
}

/// Result of trying to consume one attempt.
#[derive(Debug, Clone, Copy)]
pub enum QuotaOutcome {
    Consumed { remaining: i64, authority: QuotaAuthority },
    Denied { authority: QuotaAuthority },
}

impl QuotaOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, QuotaOutcome::Consumed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_round_trips_through_strings() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.to_string().parse::<ActivityKind>().unwrap(), kind);
        }
        assert!("poker".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn every_activity_has_a_positive_allowance() {
        for kind in ActivityKind::ALL {
            assert!(kind.daily_allowance() > 0);
        }
    }
}
