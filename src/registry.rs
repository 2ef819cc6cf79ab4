//! In-memory, insertion-ordered collection of capture results.
//!
//! Batch export hands each result to a [`DownloadSink`] in order, pausing
//! [`EXPORT_STAGGER`] between dispatches. Dispatch is fire-and-forget: the
//! loop never waits for a download to finish, only for the stagger.

use crate::error::ExportError;
use crate::export::DownloadSink;
use crate::output::CaptureResult;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pause between two dispatches of [`ResultRegistry::export_all`].
pub const EXPORT_STAGGER: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
pub struct ResultRegistry {
    entries: Vec<CaptureResult>,
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result. No deduplication, no size limit.
    pub fn add(&mut self, result: CaptureResult) {
        debug!("Registered {} ({})", result.id, result.size_label());
        self.entries.push(result);
    }

    /// Remove and return the result with `id`, if present.
    pub fn remove(&mut self, id: Uuid) -> Option<CaptureResult> {
        let pos = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&CaptureResult> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Results in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CaptureResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of encoded sizes of all results.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|r| r.byte_size).sum()
    }

    /// Dispatch a single result.
    pub fn download(&self, id: Uuid, sink: &dyn DownloadSink) -> Result<(), ExportError> {
        let result = self.get(id).ok_or(ExportError::UnknownResult { id })?;
        sink.dispatch(result)
    }

    /// Dispatch every result in insertion order with a fixed stagger.
    ///
    /// A failed dispatch is logged and does not stop the batch. Returns the
    /// number of successful dispatches.
    pub async fn export_all(&self, sink: &dyn DownloadSink) -> usize {
        info!("Exporting {} results", self.entries.len());
        let mut dispatched = 0;
        for (i, result) in self.entries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(EXPORT_STAGGER).await;
            }
            match sink.dispatch(result) {
                Ok(()) => dispatched += 1,
                Err(e) => warn!("Dispatch of {} failed: {}", result.file_name(), e),
            }
        }
        dispatched
    }
}

impl<'a> IntoIterator for &'a ResultRegistry {
    type Item = &'a CaptureResult;
    type IntoIter = std::slice::Iter<'a, CaptureResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
