// SPDX-License-Identifier: GPL-3.0-only

//! Temporal smoothing buffer
//!
//! A bounded FIFO of the last K frame planes with an elementwise running
//! average. The average always covers however many frames are currently
//! held (1..K), never a partial window padded with zeros. Changing K
//! invalidates the history: frames buffered under a different window
//! length must not leak into the new average, so `set_capacity` resets.

use std::collections::VecDeque;

/// Running-average buffer over f32 frame planes
#[derive(Debug, Clone)]
pub struct TemporalBuffer {
    capacity: usize,
    frames: VecDeque<Vec<f32>>,
    /// Elementwise sum of the buffered frames
    sum: Vec<f32>,
}

impl TemporalBuffer {
    /// Buffer holding at most `capacity` frames (capacity >= 1 is
    /// enforced at the configuration boundary)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: VecDeque::with_capacity(capacity.max(1)),
            sum: Vec::new(),
        }
    }

    /// Current window length K
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are held
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame plane, evicting the oldest when at capacity.
    ///
    /// A plane whose length differs from the buffered ones implies the
    /// camera session was reinitialized; the history is reset first.
    pub fn enqueue(&mut self, plane: Vec<f32>) {
        if self.sum.len() != plane.len() {
            self.reset();
            self.sum = vec![0.0; plane.len()];
        }
        if self.frames.len() == self.capacity
            && let Some(oldest) = self.frames.pop_front()
        {
            for (acc, old) in self.sum.iter_mut().zip(oldest.iter()) {
                *acc -= old;
            }
        }
        for (acc, new) in self.sum.iter_mut().zip(plane.iter()) {
            *acc += new;
        }
        self.frames.push_back(plane);
    }

    /// Elementwise mean over the currently held frames, or None when
    /// the buffer is empty
    pub fn value(&self) -> Option<Vec<f32>> {
        if self.frames.is_empty() {
            return None;
        }
        let count = self.frames.len() as f32;
        Some(self.sum.iter().map(|&acc| acc / count).collect())
    }

    /// Drop all history
    pub fn reset(&mut self) {
        self.frames.clear();
        self.sum.clear();
    }

    /// Change the window length K.
    ///
    /// Always resets history when the length changes: frames averaged
    /// under the old window are a different conceptual sequence.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity != self.capacity {
            self.capacity = capacity;
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_over_fewer_than_capacity() {
        let mut buffer = TemporalBuffer::new(4);
        buffer.enqueue(vec![1.0, 10.0]);
        buffer.enqueue(vec![3.0, 30.0]);
        let mean = buffer.value().unwrap();
        assert_relative_eq!(mean[0], 2.0);
        assert_relative_eq!(mean[1], 20.0);
    }

    #[test]
    fn mean_over_exactly_last_k_frames() {
        let mut buffer = TemporalBuffer::new(2);
        buffer.enqueue(vec![100.0]);
        buffer.enqueue(vec![2.0]);
        buffer.enqueue(vec![4.0]);
        // the 100.0 frame has been evicted
        assert_relative_eq!(buffer.value().unwrap()[0], 3.0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn empty_buffer_has_no_value() {
        let buffer = TemporalBuffer::new(3);
        assert!(buffer.value().is_none());
    }

    #[test]
    fn capacity_change_resets_history() {
        let mut buffer = TemporalBuffer::new(3);
        buffer.enqueue(vec![10.0]);
        buffer.enqueue(vec![20.0]);
        buffer.set_capacity(5);
        assert!(buffer.is_empty());
        // next value after a single enqueue equals that frame exactly
        buffer.enqueue(vec![7.0]);
        assert_relative_eq!(buffer.value().unwrap()[0], 7.0);
    }

    #[test]
    fn same_capacity_is_a_no_op() {
        let mut buffer = TemporalBuffer::new(3);
        buffer.enqueue(vec![10.0]);
        buffer.set_capacity(3);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn dimension_change_resets_history() {
        let mut buffer = TemporalBuffer::new(3);
        buffer.enqueue(vec![10.0, 20.0]);
        buffer.enqueue(vec![1.0, 2.0, 3.0]);
        let mean = buffer.value().unwrap();
        assert_eq!(mean.len(), 3);
        assert_relative_eq!(mean[0], 1.0);
    }
}
