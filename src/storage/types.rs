//! Storage data types and structures.

use serde::{Deserialize, Serialize};

/// Point-in-time view of an in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Spans accepted since construction.
    pub spans_appended: u64,
    /// Mutable blocks frozen since construction.
    pub rotations: u64,
    /// Immutable blocks dropped since construction.
    pub evictions: u64,
    /// Immutable blocks currently retained.
    pub immutable_blocks: usize,
    /// Distinct traces in the mutable block.
    pub mutable_traces: usize,
    /// Per-block trace entries across all blocks. A trace split by rotation
    /// counts once per block holding part of it.
    pub retained_traces: usize,
    /// Configured traces per block.
    pub block_capacity: usize,
    /// Configured immutable block count.
    pub max_immutable_blocks: usize,
}

impl StoreStats {
    /// Fraction of the retention window in use (0.0 to 1.0).
    #[allow(clippy::cast_precision_loss)]
    pub fn fill_ratio(&self) -> f64 {
        let capacity = self
            .block_capacity
            .saturating_mul(self.max_immutable_blocks.saturating_add(1));
        if capacity == 0 {
            return 0.0;
        }
        (self.retained_traces as f64 / capacity as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_ratio() {
        let stats = StoreStats {
            retained_traces: 30,
            block_capacity: 10,
            max_immutable_blocks: 5,
            ..StoreStats::default()
        };
        assert!((stats.fill_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(StoreStats::default().fill_ratio(), 0.0);
    }
}
