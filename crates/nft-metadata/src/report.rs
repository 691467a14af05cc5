//! Outcome of a pipeline run

use std::collections::BTreeMap;

use crate::error::Unresolved;
use crate::types::TokenId;

/// Counts per stage plus every token that did not make it to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Ids in the requested range
    pub requested: usize,
    pub batches: usize,
    /// Tokens for which a URI was obtained
    pub resolved: usize,
    /// Tokens skipped because an artifact already existed
    pub skipped_existing: usize,
    /// Tokens whose URI had no fetchable form
    pub dropped_unsupported: usize,
    pub fetched: usize,
    pub persisted: usize,
    pub unresolved: BTreeMap<TokenId, Unresolved>,
}

impl RunReport {
    /// Fold a worker's failures into the run report
    pub fn extend_unresolved(&mut self, failed: impl IntoIterator<Item = (TokenId, Unresolved)>) {
        self.unresolved.extend(failed);
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    /// Every routed token was persisted
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Unresolved tokens that failed at the fetch stage
    pub fn fetch_failures(&self) -> usize {
        self.unresolved
            .values()
            .filter(|reason| matches!(reason, Unresolved::Fetch { .. }))
            .count()
    }
}
