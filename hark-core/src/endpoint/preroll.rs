//! Bounded ring of the most recent raw frames.
//!
//! The rolling-fraction trigger confirms speech only after several voiced
//! frames have accumulated, so the true onset is always earlier than the
//! trigger. This buffer retains that audio so it can seed the utterance.

use std::collections::VecDeque;

use crate::buffering::frame::Frame;

/// Ordered sequence of the most recent `capacity` frames.
#[derive(Debug)]
pub struct PreRollBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl PreRollBuffer {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pre-roll capacity must be at least 1");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest once at capacity. Always succeeds.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Take the current contents in chronological order, leaving the buffer
    /// empty (ring semantics continue with subsequent pushes).
    pub fn drain(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total sample count across buffered frames.
    pub fn len_samples(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }
}
