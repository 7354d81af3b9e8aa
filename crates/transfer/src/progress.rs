/// Percentage for `offset` of `total` bytes: `floor(100 * offset / total)`,
/// capped at 99 until `completed`.
pub fn progress_percent(offset: u64, total: u64, completed: bool) -> u8 {
    if completed {
        return 100;
    }
    if total == 0 {
        return 0;
    }
    let pct = (offset as u128 * 100 / total as u128).min(99);
    pct as u8
}

/// Produces the progress sequence of one upload.
///
/// Values never decrease. The last value is 100, emitted only by
/// [`complete`](Self::complete).
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total: u64,
    last: u8,
    done: bool,
}

impl ProgressMeter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            last: 0,
            done: false,
        }
    }

    /// Records an acknowledged offset and returns the percentage to report.
    pub fn advance(&mut self, offset: u64) -> u8 {
        if !self.done {
            self.last = self.last.max(progress_percent(offset, self.total, false));
        }
        self.last
    }

    /// Marks the upload complete; returns 100.
    pub fn complete(&mut self) -> u8 {
        self.done = true;
        self.last = 100;
        self.last
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    pub fn is_complete(&self) -> bool {
        self.done
    }
}
