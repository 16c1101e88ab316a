//! Id allocation.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use super::types::{AdId, RateId};

/// Source of fresh advertisement and rate ids. Owned by the orchestrator and
/// injected at construction.
pub trait IdAllocator: Send + Sync + fmt::Debug {
    fn next_ad_id(&self) -> AdId;
    fn next_rate_id(&self) -> RateId;
}

/// Monotonic counters, unique within one process lifetime.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next_ad: AtomicI64,
    next_rate: AtomicI64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ad: i64, rate: i64) -> Self {
        Self {
            next_ad: AtomicI64::new(ad),
            next_rate: AtomicI64::new(rate),
        }
    }
}

impl IdAllocator for SequentialIds {
    fn next_ad_id(&self) -> AdId {
        AdId(self.next_ad.fetch_add(1, Ordering::Relaxed))
    }

    fn next_rate_id(&self) -> RateId {
        RateId(self.next_rate.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_streams_are_independent() {
        let ids = SequentialIds::starting_at(10, 0);
        assert_eq!(ids.next_ad_id(), AdId(10));
        assert_eq!(ids.next_rate_id(), RateId(0));
        assert_eq!(ids.next_rate_id(), RateId(1));
        assert_eq!(ids.next_ad_id(), AdId(11));
    }

    #[test]
    fn test_unique_under_contention() {
        let ids = Arc::new(SequentialIds::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_rate_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
