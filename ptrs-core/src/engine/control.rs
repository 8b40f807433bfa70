//! Cooperative cancellation and progress reporting for long runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared between a running simulation and whoever observes it.
///
/// The engine checks the cancel flag before each sample block and bumps the
/// completed counter after it; observers poll [`RunControl::fraction`].
///
/// Jobs made of several runs call [`RunControl::reserve`] with their whole
/// sample count before the first run starts. Runs then draw their share from
/// the reservation instead of growing the total, so `fraction` never moves
/// backwards.
#[derive(Debug, Default)]
pub struct RunControl {
    cancelled: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
    reserved: AtomicUsize,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run returns `Aborted` at the next block boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Samples finished so far in the current phase.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Fraction complete in `[0, 1]`; 0 before any work is registered.
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed() as f64 / total as f64).min(1.0)
    }

    /// Announce `samples` of upcoming work spread over several runs.
    pub fn reserve(&self, samples: usize) {
        self.reserved.fetch_add(samples, Ordering::Relaxed);
        self.total.fetch_add(samples, Ordering::Relaxed);
    }

    /// Register one run of `samples`, drawing on the reservation first and
    /// growing the total only by the part not reserved.
    pub(crate) fn claim_work(&self, samples: usize) {
        let mut from_reserve = 0;
        let _ = self
            .reserved
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| {
                from_reserve = left.min(samples);
                Some(left - from_reserve)
            });
        let extra = samples - from_reserve;
        if extra > 0 {
            self.total.fetch_add(extra, Ordering::Relaxed);
        }
    }

    pub(crate) fn advance(&self, n: usize) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_tracks_completed_work() {
        let c = RunControl::new();
        assert_eq!(c.fraction(), 0.0);
        c.claim_work(200);
        c.advance(50);
        assert!((c.fraction() - 0.25).abs() < 1e-12);
        c.advance(150);
        assert_eq!(c.fraction(), 1.0);
    }

    #[test]
    fn unreserved_work_accumulates_across_runs() {
        let c = RunControl::new();
        c.claim_work(100);
        c.advance(100);
        c.claim_work(100);
        assert!((c.fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reserved_work_is_counted_once() {
        let c = RunControl::new();
        c.reserve(300);
        c.claim_work(100);
        c.advance(100);
        assert_eq!(c.total(), 300);
        c.claim_work(100);
        c.advance(100);
        c.claim_work(100);
        assert_eq!(c.total(), 300);
        assert!((c.fraction() - 2.0 / 3.0).abs() < 1e-12);
        c.advance(100);
        assert_eq!(c.fraction(), 1.0);
    }

    #[test]
    fn claim_beyond_reservation_grows_total() {
        let c = RunControl::new();
        c.reserve(50);
        c.claim_work(80);
        assert_eq!(c.total(), 80);
    }

    #[test]
    fn cancel_is_sticky() {
        let c = RunControl::new();
        assert!(!c.is_cancelled());
        c.cancel();
        assert!(c.is_cancelled());
    }
}
