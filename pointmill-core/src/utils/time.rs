use chrono::{Local, NaiveDate};

use pointmill_common::error::Error;

/// Key format for day-partitioned quota counters.
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Day key for the machine-local calendar date. Every quota call
/// recomputes this, so midnight rollover takes effect on the next call
/// with no reset step.
pub fn current_day_key() -> String {
    Local::now().date_naive().format(DAY_KEY_FORMAT).to_string()
}

/// Day key for an explicit date.
pub fn day_key_for(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Parse a key produced by [`current_day_key`] back into a date.
pub fn parse_day_key(key: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT)
        .map_err(|e| Error::Parse(format!("bad day key '{}': {}", key, e)))
}
