//! Partitioning of a token id range into multicall-sized batches

use crate::types::TokenId;
use alloy::primitives::U256;

/// Inclusive, contiguous range of token ids resolved with one aggregated call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: TokenId,
    pub end: TokenId,
}

#[allow(clippy::len_without_is_empty)]
impl Batch {
    /// Number of ids in the batch. Batches are bounded by the batch size, so this fits.
    pub fn len(&self) -> usize {
        let span = self.end - self.start;
        usize::try_from(span).map_or(usize::MAX, |n| n.saturating_add(1))
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = TokenId> {
        let start = self.start;
        (0..self.len()).map(move |offset| start + U256::from(offset))
    }
}

/// Lazy, ascending sequence of batches over an inclusive id range
#[derive(Debug, Clone)]
pub struct BatchPlan {
    next_start: Option<TokenId>,
    upper: TokenId,
    step: U256,
}

impl Iterator for BatchPlan {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let start = self.next_start?;
        let end = start.saturating_add(self.step).min(self.upper);
        self.next_start = (end < self.upper).then(|| end + U256::from(1));
        Some(Batch { start, end })
    }
}

/// Split `[lower, upper]` into ascending batches of at most `batch_size` ids.
///
/// Batches are produced on demand, so wide ranges cost no memory up front.
/// Yields nothing when `lower > upper` or `batch_size == 0`.
pub fn plan_batches(lower: TokenId, upper: TokenId, batch_size: usize) -> BatchPlan {
    BatchPlan {
        next_start: (lower <= upper && batch_size > 0).then_some(lower),
        upper,
        step: U256::from(batch_size.saturating_sub(1)),
    }
}
