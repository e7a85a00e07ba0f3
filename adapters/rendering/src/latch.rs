/// Counting barrier over a fixed number of asset loads.
///
/// Every load settles exactly once, successfully or not. The settle that
/// completes the set reports `true` so the caller can trigger the single
/// redraw that swaps fallback colors for sprites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetLatch {
    total: usize,
    settled: usize,
    failed: usize,
}

impl AssetLatch {
    /// Creates a latch waiting for `total` loads.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            settled: 0,
            failed: 0,
        }
    }

    /// Records one settled load. Returns `true` when it was the last one.
    ///
    /// Settles beyond the expected total are ignored.
    pub fn settle(&mut self, loaded: bool) -> bool {
        if self.is_open() {
            return false;
        }
        self.settled += 1;
        if !loaded {
            self.failed += 1;
        }
        self.is_open()
    }

    /// Reports whether every expected load has settled.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.settled >= self.total
    }

    /// Number of loads that settled.
    #[must_use]
    pub const fn settled(&self) -> usize {
        self.settled
    }

    /// Number of settled loads that failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Reports whether every expected load succeeded.
    #[must_use]
    pub const fn all_loaded(&self) -> bool {
        self.is_open() && self.failed == 0
    }
}
