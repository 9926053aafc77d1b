//! Moving median smoothing over a bounded sample window

use std::collections::VecDeque;

/// Sliding-window median filter for level samples.
///
/// Holds the most recent `capacity` samples, evicting the oldest first, and
/// computes the median on demand. The median of an empty window is defined
/// as 0.0 rather than an error.
pub struct MedianFilter {
    window: VecDeque<f32>,
    capacity: usize,
}

impl MedianFilter {
    /// Create a filter holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when the window is full
    pub fn push(&mut self, sample: f32) {
        self.window.push_back(sample);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Median of the current window contents.
    ///
    /// Odd counts return the middle element of the sorted window; even counts
    /// return the mean of the two middle elements.
    pub fn median(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f32> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Discard all samples
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[cfg(test)]
    fn contents(&self) -> Vec<f32> {
        self.window.iter().copied().collect()
    }
}
