// File: pointmill-common/src/models/prize.rs

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Weights are percentages; a valid table sums to 100 within this tolerance.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PrizeTableEntry {
    pub label: String,
    pub points: i64,
    pub weight: f64,
}

impl PrizeTableEntry {
    pub fn new(label: &str, points: i64, weight: f64) -> Self {
        Self {
            label: label.to_string(),
            points,
            weight,
        }
    }
}

/// Ordered weighted prize list. Selection walks the entries in order and
/// picks the first one whose cumulative weight exceeds the roll, so the
/// listed order is part of the table's identity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrizeTable {
    entries: Vec<PrizeTableEntry>,
}

impl PrizeTable {
    pub fn new(entries: Vec<PrizeTableEntry>) -> Result<Self, Error> {
        if entries.is_empty() {
            return Err(Error::Parse("prize table must not be empty".to_string()));
        }
        for entry in &entries {
            if entry.weight <= 0.0 || !entry.weight.is_finite() {
                return Err(Error::Parse(format!(
                    "prize '{}' has non-positive weight {}",
                    entry.label, entry.weight
                )));
            }
            if entry.points < 0 {
                return Err(Error::Parse(format!(
                    "prize '{}' has negative point value {}",
                    entry.label, entry.points
                )));
            }
        }
        let total: f64 = entries.iter().map(|e| e.weight).sum();
        if (total - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Parse(format!(
                "prize table weights sum to {}, expected 100",
                total
            )));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PrizeTableEntry] {
        &self.entries
    }

    /// Resolve a roll in [0, 100) to the first entry whose cumulative
    /// weight strictly exceeds it. A roll left uncovered by accumulated
    /// floating error maps to the first entry.
    pub fn entry_for(&self, roll: f64) -> &PrizeTableEntry {
        let mut cumulative = 0.0;
        for entry in &self.entries {
            cumulative += entry.weight;
            if roll < cumulative {
                return entry;
            }
        }
        &self.entries[0]
    }

    /// Draw one entry. Pure in everything but `rng`: no account state, no
    /// balance, just the roll.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &PrizeTableEntry {
        self.entry_for(rng.random_range(0.0..100.0))
    }

    /// The production spin wheel. Small prizes dominate; the two rightmost
    /// slots are deliberately sub-percent.
    pub fn default_spin() -> Self {
        Self {
            entries: vec![
                PrizeTableEntry::new("5 points", 5, 30.0),
                PrizeTableEntry::new("10 points", 10, 25.0),
                PrizeTableEntry::new("15 points", 15, 20.0),
                PrizeTableEntry::new("20 points", 20, 15.0),
                PrizeTableEntry::new("50 points", 50, 7.0),
                PrizeTableEntry::new("100 points", 100, 2.5),
                PrizeTableEntry::new("250 points", 250, 0.4),
                PrizeTableEntry::new("500 points", 500, 0.1),
            ],
        }
    }

    /// The production scratch card. Unlike the wheel it can lose outright;
    /// a zero-point entry consumes the attempt without a ledger write.
    pub fn default_scratch() -> Self {
        Self {
            entries: vec![
                PrizeTableEntry::new("No prize", 0, 40.0),
                PrizeTableEntry::new("10 points", 10, 30.0),
                PrizeTableEntry::new("25 points", 25, 20.0),
                PrizeTableEntry::new("75 points", 75, 8.0),
                PrizeTableEntry::new("200 points", 200, 2.0),
            ],
        }
    }
}
