//! Domain identifier generation.
//!
//! Ids are a short entity prefix plus a zero-padded decimal: `AS000123`,
//! `FP0000012345`. The counter is seeded from the epoch-millisecond clock at
//! construction so ids from separate runs rarely collide, and incremented
//! atomically so ids within a run never do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    /// Airspace id: `AS` + 6 digits.
    pub fn airspace_id(&self) -> String {
        self.next("AS", 1_000_000, 6)
    }

    /// Flight permit id: `FP` + 10 digits.
    pub fn permit_id(&self) -> String {
        self.next("FP", 10_000_000_000, 10)
    }

    /// Flight task id: `FT` + 10 digits.
    pub fn task_id(&self) -> String {
        self.next("FT", 10_000_000_000, 10)
    }

    /// Flight conflict id: `FC` + 10 digits.
    pub fn conflict_id(&self) -> String {
        self.next("FC", 10_000_000_000, 10)
    }

    fn next(&self, prefix: &str, modulus: u64, width: usize) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) % modulus;
        format!("{prefix}{n:0width$}")
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_width() {
        let ids = IdGenerator::new();
        let airspace = ids.airspace_id();
        assert!(airspace.starts_with("AS"));
        assert_eq!(airspace.len(), 8);

        let permit = ids.permit_id();
        assert!(permit.starts_with("FP"));
        assert_eq!(permit.len(), 12);

        let conflict = ids.conflict_id();
        assert!(conflict.starts_with("FC"));
        assert_eq!(conflict.len(), 12);
    }

    #[test]
    fn ids_are_unique_within_a_run() {
        let ids = IdGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(ids.permit_id()));
        }
    }
}
