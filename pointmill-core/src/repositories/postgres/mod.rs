// src/repositories/postgres/mod.rs

pub mod account;
pub mod ledger;
pub mod quota;
pub mod redemption;
