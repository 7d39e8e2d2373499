//! Epoch points and their append-only history

use olas_core::{amount_serde, Amount, FixedPoint, Timestamp};
use serde::{Deserialize, Serialize};

/// Per unit class (component or agent) results of an epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPoint {
    pub ucf: FixedPoint,
    /// Revenue share distributed to unit owners
    #[serde(with = "amount_serde")]
    pub rewards: Amount,
    /// Minted top-ups distributed to unit owners
    #[serde(with = "amount_serde")]
    pub top_ups: Amount,
    /// Units earning for the first time
    pub num_new_units: u32,
}

/// Immutable record of a completed epoch
///
/// The default point (all zeros) stands for "not computed"; a real point
/// always has `idf >= 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPoint {
    pub epoch: u32,
    pub ucf: FixedPoint,
    pub ucfc: UnitPoint,
    pub ucfa: UnitPoint,
    pub idf: FixedPoint,
    #[serde(with = "amount_serde")]
    pub total_revenue: Amount,
    #[serde(with = "amount_serde")]
    pub whitelisted_revenue: Amount,
    #[serde(with = "amount_serde")]
    pub staker_rewards: Amount,
    #[serde(with = "amount_serde")]
    pub owner_top_ups: Amount,
    #[serde(with = "amount_serde")]
    pub staker_top_ups: Amount,
    #[serde(with = "amount_serde")]
    pub treasury_rewards: Amount,
    pub block_timestamp: Timestamp,
    pub num_new_owners: u32,
}

impl EpochPoint {
    pub fn is_default(&self) -> bool {
        self.idf.is_zero()
    }
}

/// Points indexed by epoch number; slot 0 holds the default point
#[derive(Debug, Clone)]
pub struct PointHistory {
    points: Vec<EpochPoint>,
}

impl PointHistory {
    pub fn new() -> Self {
        Self {
            points: vec![EpochPoint::default()],
        }
    }

    /// Append a point, numbering it, and return its epoch
    pub fn push(&mut self, mut point: EpochPoint) -> u32 {
        let epoch = self.points.len() as u32;
        point.epoch = epoch;
        self.points.push(point);
        epoch
    }

    /// The point of `epoch`, or the default point if it was never written
    pub fn get(&self, epoch: u32) -> EpochPoint {
        self.points
            .get(epoch as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn last(&self) -> EpochPoint {
        self.points.last().copied().unwrap_or_default()
    }

    /// Number of the newest written epoch, zero when empty
    pub fn last_epoch(&self) -> u32 {
        (self.points.len() - 1) as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpochPoint> {
        self.points.iter().skip(1)
    }
}

impl Default for PointHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_and_numbering() {
        let mut history = PointHistory::new();
        assert_eq!(history.last_epoch(), 0);
        assert!(history.last().is_default());

        let epoch = history.push(EpochPoint {
            epoch: 99,
            idf: FixedPoint::ONE,
            ..Default::default()
        });
        assert_eq!(epoch, 1);
        assert_eq!(history.get(1).epoch, 1);
        assert!(!history.get(1).is_default());
        assert!(history.get(0).is_default());
        assert!(history.get(2).is_default());
        assert_eq!(history.iter().count(), 1);
    }
}
