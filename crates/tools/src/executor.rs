//! Per-Item Failure Policy
//!
//! Most tools issue one engine call per distance, pair or feature. An
//! `ItemResults` collects those outcomes under the skip-and-continue
//! policy: a failed item is logged, recorded as a `Warning` and left out.
//! Whether an empty result is an error is decided by the caller through
//! `require_any`.

use map_analysis_core::{CoreError, CoreResult, Warning};

/// Outcomes of the per-item engine calls of one tool step.
#[derive(Debug)]
pub struct ItemResults<T> {
    stage: &'static str,
    items: Vec<T>,
    warnings: Vec<Warning>,
    failed: usize,
}

impl<T> ItemResults<T> {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            items: Vec::new(),
            warnings: Vec::new(),
            failed: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items);
    }

    /// Record one engine call. Returns the value on success; on failure
    /// the item is skipped with a warning and `None` is returned.
    pub fn attempt<U>(&mut self, index: usize, result: CoreResult<U>) -> Option<U> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.skip(index, err.to_string());
                None
            }
        }
    }

    /// Skip an item explicitly.
    pub fn skip(&mut self, index: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("[{}] skipping item {}: {}", self.stage, index, message);
        self.failed += 1;
        self.warnings
            .push(Warning::new(self.stage, message).with_item(index));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of skipped items.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<Warning>) {
        (self.items, self.warnings)
    }

    /// Fail with `Operation(message)` when nothing succeeded.
    pub fn require_any(self, message: impl Into<String>) -> CoreResult<(Vec<T>, Vec<Warning>)> {
        if self.items.is_empty() {
            let message = message.into();
            tracing::info!(
                "[{}] no results after {} skipped item(s)",
                self.stage,
                self.failed
            );
            return Err(CoreError::operation(message));
        }
        Ok(self.into_parts())
    }
}
