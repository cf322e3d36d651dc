//! The CPU-bound job used to keep worker children busy.

use std::fmt;

/// A stateless unit of CPU work: the sum of squares over `0..n`.
///
/// The harness never reads a job's result. Its only purpose is to occupy a pool slot long
/// enough that, with one task per child, the pool is constantly retiring and respawning
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChurnJob {
    /// Upper bound (exclusive) of the summed range.
    pub n: u64,
}

impl ChurnJob {
    /// Range size used by the external task when no argument is supplied.
    pub const DEFAULT_N: u64 = 100_000;

    /// Creates a job summing squares over `0..n`.
    pub fn new(n: u64) -> Self {
        Self { n }
    }

    /// Performs the work.
    ///
    /// Sums in `u128`, which holds the result for any `n` up to `10^9`.
    pub fn compute(&self) -> u128 {
        (0..self.n as u128).map(|i| i * i).sum()
    }
}

impl Default for ChurnJob {
    fn default() -> Self {
        Self::new(Self::DEFAULT_N)
    }
}

impl fmt::Display for ChurnJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChurnJob {{ n: {} }}", self.n)
    }
}
