//! Bounded history of iterate/residual differences.
//!
//! The direction strategies consume pairs (Δw, ΔR) of consecutive
//! iterate and residual differences. The buffer holds at most `capacity`
//! pairs; pushing into a full buffer evicts the oldest, and the restart
//! policy may clear it wholesale.

use std::collections::VecDeque;

/// One secant pair: iterate difference and residual difference.
#[derive(Debug, Clone)]
pub struct SecantPair {
    /// Δw between consecutive accepted iterates
    pub dw: Vec<f64>,
    /// ΔR between the corresponding residuals
    pub dr: Vec<f64>,
}

/// Ring buffer of secant pairs.
#[derive(Debug)]
pub struct DirectionMemory {
    capacity: usize,
    dim: usize,
    pairs: VecDeque<SecantPair>,
}

impl DirectionMemory {
    /// Create an empty buffer holding up to `capacity` pairs of vectors
    /// of length `dim`.
    pub fn new(capacity: usize, dim: usize) -> Self {
        Self {
            capacity,
            dim,
            pairs: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of stored pairs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.pairs.len() == self.capacity
    }

    /// Append a pair, evicting the oldest when full. No-op when the
    /// configured capacity is zero.
    pub fn push(&mut self, dw: Vec<f64>, dr: Vec<f64>) {
        if self.capacity == 0 {
            return;
        }
        debug_assert_eq!(dw.len(), self.dim);
        debug_assert_eq!(dr.len(), self.dim);
        if self.is_full() {
            self.pairs.pop_front();
        }
        self.pairs.push_back(SecantPair { dw, dr });
    }

    /// Drop all stored pairs.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Oldest-to-newest iteration over the stored pairs.
    pub fn iter(&self) -> impl Iterator<Item = &SecantPair> {
        self.pairs.iter()
    }

    /// Vector dimension of the stored pairs.
    pub fn dim(&self) -> usize {
        self.dim
    }
}
