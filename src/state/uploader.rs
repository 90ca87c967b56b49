//! File uploader that publishes into a lazily created results collection.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ContentionWindow;
use crate::journal::{Journal, RecordKind};
use crate::state::collection::Collection;
use crate::state::lazy::LazySingleton;

/// Outcome of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Upload finished.
    Success,
}

/// Uploads a fixed set of files, one per unit, recording each status into `results`.
///
/// The results collection itself is always appended to safely; the hazard is in creating it.
/// When two units find it absent at the same time each creates its own, and the statuses pushed
/// into the discarded one never show up in the final count.
#[derive(Debug)]
pub struct FileUploader {
    files: Vec<String>,
    results: LazySingleton<Collection<UploadStatus>>,
    window: ContentionWindow,
    journal: Arc<Journal>,
}

impl FileUploader {
    /// Uploader for `files`.
    pub fn new(files: Vec<String>) -> Self {
        let journal = Arc::new(Journal::new());
        Self {
            files,
            results: Self::results_slot(Arc::clone(&journal), ContentionWindow::None),
            window: ContentionWindow::None,
            journal,
        }
    }

    /// Uploader for `count` generated file names.
    pub fn with_generated_files(count: usize) -> Self {
        Self::new((0..count).map(|n| format!("upload-{n}.png")).collect())
    }

    /// Simulated upload latency, also opened between the absent check and the creation of the
    /// results collection.
    pub fn with_window(mut self, window: ContentionWindow) -> Self {
        self.window = window;
        self.results = Self::results_slot(Arc::clone(&self.journal), window);
        self
    }

    /// Record uploads, allocations and appends into a shared journal.
    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.results = Self::results_slot(Arc::clone(&journal), self.window);
        self.journal = journal;
        self
    }

    /// Files to upload.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Upload the file at `index` and publish its status.
    ///
    /// With `guarded` the results collection is created under mutual exclusion.
    /// Out-of-range indexes are ignored.
    pub fn upload(&self, index: usize, guarded: bool) {
        let Some(status) = self.upload_file(index) else {
            return;
        };
        let results = if guarded {
            self.results(Some(index))
        } else {
            self.results_unguarded(Some(index))
        };
        results.append(status, Some(index));
    }

    /// Perform the upload without publishing. Returns `None` for an unknown index.
    pub fn upload_file(&self, index: usize) -> Option<UploadStatus> {
        let file = self.files.get(index)?;
        self.window.apply();
        self.journal
            .record(Some(index), RecordKind::Uploaded, format!("uploaded {file}"));
        Some(UploadStatus::Success)
    }

    /// Results collection, created under mutual exclusion on first access.
    pub fn results(&self, unit: Option<usize>) -> Arc<Collection<UploadStatus>> {
        self.results.get(unit)
    }

    /// Results collection, created with no exclusion on first access.
    pub fn results_unguarded(&self, unit: Option<usize>) -> Arc<Collection<UploadStatus>> {
        self.results.get_unguarded(unit)
    }

    /// Number of statuses in the collection currently stored, without creating one.
    pub fn published(&self) -> usize {
        self.results.peek().map_or(0, |results| results.len())
    }

    /// How many results collections were created.
    pub fn result_collections(&self) -> usize {
        self.results.allocations()
    }

    fn results_slot(
        journal: Arc<Journal>,
        window: ContentionWindow,
    ) -> LazySingleton<Collection<UploadStatus>> {
        let appends = Arc::clone(&journal);
        LazySingleton::new(move |_| Collection::new().with_journal(Arc::clone(&appends)))
            .with_window(window)
            .with_journal(journal)
    }
}
