//! Sliding anti-replay window for datagram records.
//!
//! Tracks the highest authenticated sequence number and a bitmap of the
//! [`WINDOW_SIZE`] numbers below it. A number is accepted once; anything
//! older than the window is rejected outright.

/// Sequence numbers tracked below the highest one seen.
pub const WINDOW_SIZE: u64 = 64;

/// Per-epoch replay state. Reset on every rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayWindow {
    highest: Option<u64>,
    /// Bit `i` set means `highest - i` has been accepted.
    bitmap: u64,
}

impl ReplayWindow {
    /// Empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `seq` may still be accepted. Does not record it.
    pub fn check(&self, seq: u64) -> bool {
        let Some(highest) = self.highest else {
            return true;
        };
        if seq > highest {
            return true;
        }
        let offset = highest - seq;
        offset < WINDOW_SIZE && self.bitmap & (1 << offset) == 0
    }

    /// Record `seq` as accepted. Call only after the record authenticated.
    pub fn mark(&mut self, seq: u64) {
        match self.highest {
            None => {
                self.highest = Some(seq);
                self.bitmap = 1;
            },
            Some(highest) if seq > highest => {
                let shift = seq - highest;
                self.bitmap = if shift >= WINDOW_SIZE { 0 } else { self.bitmap << shift };
                self.bitmap |= 1;
                self.highest = Some(seq);
            },
            Some(highest) => {
                let offset = highest - seq;
                if offset < WINDOW_SIZE {
                    self.bitmap |= 1 << offset;
                }
            },
        }
    }

    /// Highest sequence number accepted so far.
    pub fn highest(&self) -> Option<u64> {
        self.highest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_number_once() {
        let mut window = ReplayWindow::new();
        assert!(window.check(5));
        window.mark(5);
        assert!(!window.check(5));
    }

    #[test]
    fn accepts_out_of_order_within_window() {
        let mut window = ReplayWindow::new();
        window.mark(10);
        assert!(window.check(3));
        window.mark(3);
        assert!(!window.check(3));
        assert!(window.check(4));
    }

    #[test]
    fn rejects_numbers_behind_window() {
        let mut window = ReplayWindow::new();
        window.mark(100);
        assert!(!window.check(100 - WINDOW_SIZE));
        assert!(window.check(100 - WINDOW_SIZE + 1));
    }

    #[test]
    fn large_jump_clears_bitmap() {
        let mut window = ReplayWindow::new();
        window.mark(0);
        window.mark(1_000);
        assert_eq!(window.highest(), Some(1_000));
        assert!(window.check(999));
        assert!(!window.check(0));
    }
}
