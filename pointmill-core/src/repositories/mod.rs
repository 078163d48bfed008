// src/repositories/mod.rs

pub use postgres::account::PostgresAccountRepository;
pub use postgres::ledger::PostgresLedgerRepository;
pub use postgres::quota::PostgresQuotaRepository;
pub use postgres::redemption::PostgresRedemptionRepository;

pub mod postgres;
