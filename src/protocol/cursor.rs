//! Directory enumeration cursor.

use crate::tree::NodeInfo;
use std::collections::VecDeque;

/// Cursor over a snapshot of a directory's children.
///
/// Drained in batches; once exhausted it keeps returning `None` until a new
/// cursor is taken.
#[derive(Debug, Default)]
pub struct DirCursor {
    entries: VecDeque<NodeInfo>,
}

impl DirCursor {
    pub fn new(entries: Vec<NodeInfo>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Up to `batch` entries (at least one), or `None` once drained.
    pub fn next_batch(&mut self, batch: usize) -> Option<Vec<NodeInfo>> {
        if self.entries.is_empty() {
            return None;
        }
        let take = batch.max(1).min(self.entries.len());
        Some(self.entries.drain(..take).collect())
    }
}
