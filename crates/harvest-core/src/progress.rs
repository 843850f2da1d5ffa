use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Loosely synchronized `(processed, total)` pair for "poll and display" progress.
///
/// One engine writes, any number of readers poll. Readers may observe a pair that
/// is momentarily inconsistent; `processed` never decreases.
#[derive(Debug, Default)]
pub struct Progress {
    processed: AtomicU64,
    total: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    /// Whole percent, `None` while the total is still unknown.
    pub fn percent(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        Some((self.processed.min(self.total) * 100) / self.total)
    }
}

impl Progress {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn advance(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_snapshot() {
        let p = Progress::shared();
        p.set_total(4);
        p.advance(1);
        p.advance(2);
        assert_eq!(p.snapshot(), ProgressSnapshot { processed: 3, total: 4 });
        assert_eq!(p.snapshot().percent(), Some(75));
    }

    #[test]
    fn percent_unknown_without_total() {
        assert_eq!(ProgressSnapshot::default().percent(), None);
    }
}
