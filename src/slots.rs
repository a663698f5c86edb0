use crate::metrics::{CheckRecord, EXPECTED_INTERVAL_MS};
use chrono::{DateTime, Utc};

/// Index of the check-cadence bucket containing `ms`
pub fn slot_of_ms(ms: i64) -> i64 {
    ms.div_euclid(EXPECTED_INTERVAL_MS)
}

pub fn slot_of(timestamp: DateTime<Utc>) -> i64 {
    slot_of_ms(timestamp.timestamp_millis())
}

/// Sorted, deduplicated sequence of slots in which at least one check landed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    slots: Vec<i64>,
}

impl SlotIndex {
    /// Records must already be in ascending timestamp order.
    pub fn from_records(records: &[CheckRecord]) -> Self {
        let mut slots: Vec<i64> = records.iter().map(|r| slot_of(r.timestamp)).collect();
        slots.dedup();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn first(&self) -> Option<i64> {
        self.slots.first().copied()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[i64] {
        &self.slots
    }

    /// Number of observed slots in `[lo, hi]`, inclusive on both ends.
    pub fn count_in_range(&self, lo: i64, hi: i64) -> u64 {
        if lo > hi {
            return 0;
        }
        let start = self.slots.partition_point(|&s| s < lo);
        let end = self.slots.partition_point(|&s| s <= hi);
        end.saturating_sub(start) as u64
    }
}
