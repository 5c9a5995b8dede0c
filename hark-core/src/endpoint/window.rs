//! Fixed-capacity voting window over per-frame speech verdicts.
//!
//! Each insert overwrites the oldest slot and maintains a running voiced
//! count, so the rolling fraction is O(1) per frame — no rescans.

/// Circular buffer of the most recent `capacity` boolean verdicts.
#[derive(Debug, Clone)]
pub struct VotingWindow {
    slots: Vec<bool>,
    /// Next slot to overwrite (cyclic).
    cursor: usize,
    /// Running count of `true` slots; always consistent with `slots`.
    voiced: usize,
}

impl VotingWindow {
    /// Create a window of `capacity` slots, all initially unvoiced.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "voting window capacity must be at least 1");
        Self {
            slots: vec![false; capacity],
            cursor: 0,
            voiced: 0,
        }
    }

    /// Record one verdict, evicting the oldest.
    pub fn insert(&mut self, voiced: bool) {
        let old = std::mem::replace(&mut self.slots[self.cursor], voiced);
        if old {
            self.voiced -= 1;
        }
        if voiced {
            self.voiced += 1;
        }
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Overwrite every slot with `verdict` and reset the cursor.
    pub fn fill(&mut self, verdict: bool) {
        self.slots.fill(verdict);
        self.voiced = if verdict { self.slots.len() } else { 0 };
        self.cursor = 0;
    }

    /// Fraction of slots currently voiced, in [0, 1].
    pub fn voiced_fraction(&self) -> f32 {
        self.voiced as f32 / self.slots.len() as f32
    }

    /// Fraction of slots currently unvoiced, in [0, 1].
    pub fn unvoiced_fraction(&self) -> f32 {
        (self.slots.len() - self.voiced) as f32 / self.slots.len() as f32
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
