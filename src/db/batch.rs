// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Batch accumulator: partitions staged writes into bounded atomic groups.
//!
//! Firestore rejects batches with more than 500 operations, so groups are
//! capped one below that. Each group commits atomically; there is no
//! atomicity across groups, so every caller must stage idempotent writes
//! (absolute values, never relative increments) that are safe to re-run
//! after a partial commit.

use crate::db::{DocumentStore, Write};
use crate::error::AppError;

/// Maximum operations per atomic group.
pub const MAX_BATCH_OPERATIONS: usize = 499;

/// Result of a fully successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub groups: usize,
    pub operations: usize,
}

/// Accumulates writes into ordered groups of at most `limit` operations.
#[derive(Debug)]
pub struct BatchAccumulator {
    limit: usize,
    groups: Vec<Vec<Write>>,
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        Self::new(MAX_BATCH_OPERATIONS)
    }
}

impl BatchAccumulator {
    /// Create an accumulator with the given per-group ceiling.
    ///
    /// The ceiling is clamped to `1..=MAX_BATCH_OPERATIONS`.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_BATCH_OPERATIONS),
            groups: Vec::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stage one write, spilling into a new group when the current one is full.
    pub fn stage(&mut self, write: Write) {
        match self.groups.last_mut() {
            Some(group) if group.len() < self.limit => group.push(write),
            _ => self.groups.push(vec![write]),
        }
    }

    /// Stage writes that must land in the same group.
    ///
    /// If the unit does not fit in the current group it starts a new one.
    pub fn stage_atomic(&mut self, writes: Vec<Write>) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }
        if writes.len() > self.limit {
            return Err(AppError::InvalidArgument(format!(
                "Atomic unit of {} writes exceeds batch limit {}",
                writes.len(),
                self.limit
            )));
        }
        match self.groups.last_mut() {
            Some(group) if group.len() + writes.len() <= self.limit => group.extend(writes),
            _ => self.groups.push(writes),
        }
        Ok(())
    }

    /// The staged groups, in commit order.
    pub fn groups(&self) -> &[Vec<Write>] {
        &self.groups
    }

    /// Total staged operations.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Commit every group in order.
    ///
    /// Stops at the first failing group and returns
    /// [`AppError::PartialCommit`] describing what was already applied.
    pub async fn commit(self, store: &dyn DocumentStore) -> Result<CommitSummary, AppError> {
        let mut summary = CommitSummary::default();
        let total_groups = self.groups.len();

        for (index, group) in self.groups.into_iter().enumerate() {
            if let Err(e) = store.commit(&group).await {
                tracing::error!(
                    group = index + 1,
                    total_groups,
                    committed_operations = summary.operations,
                    error = %e,
                    "Batch group commit failed; remaining groups skipped"
                );
                return Err(AppError::PartialCommit {
                    committed_groups: summary.groups,
                    committed_operations: summary.operations,
                    reason: e.to_string(),
                });
            }
            summary.groups += 1;
            summary.operations += group.len();
            tracing::debug!(
                group = index + 1,
                total_groups,
                operations = group.len(),
                "Committed batch group"
            );
        }

        Ok(summary)
    }
}
