// File: pointmill-common/src/models/mod.rs
pub mod account;
pub mod catalog;
pub mod ledger;
pub mod prize;
pub mod quota;
pub mod redemption;

pub use account::Account;
pub use catalog::{RewardCatalog, RewardOption};
pub use ledger::{LedgerEntry, LedgerEntryKind};
pub use prize::{PrizeTable, PrizeTableEntry};
pub use quota::{ActivityKind, QuotaAuthority, QuotaOutcome, QuotaStatus};
pub use redemption::{DurationTier, RedemptionContact, RedemptionRequest, RedemptionStatus};
