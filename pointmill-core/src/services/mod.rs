// File: src/services/mod.rs

pub mod bonus_service;
pub mod economy_service;
pub mod ledger_service;
pub mod quota_tracker;
pub mod redemption_service;

pub use bonus_service::{BonusIssuer, BonusOutcome, SIGNUP_BONUS_POINTS};
pub use economy_service::{EarnOutcome, EconomyBackend, EconomyConfig, EconomyService};
pub use ledger_service::{LedgerAudit, LedgerService};
pub use quota_tracker::QuotaTracker;
pub use redemption_service::RedemptionService;
