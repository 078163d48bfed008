// File: src/cache/mod.rs

pub mod balance;
pub mod local_day;

pub use balance::{BalanceCache, CachedBalance};
pub use local_day::LocalDayStore;
