use std::time::{Duration, Instant};

/// Mutable counters of one ingestion run
#[derive(Debug, Clone)]
pub struct BatchState {
    pub documents_processed: u64,
    pub bytes_processed: u64,
    pub start: Instant,
    /// Document count at the most recent commit
    pub last_commit_at: Option<u64>,
    pub commits: u64,
}

impl BatchState {
    fn new(start: Instant) -> Self {
        Self {
            documents_processed: 0,
            bytes_processed: 0,
            start,
            last_commit_at: None,
            commits: 0,
        }
    }

    /// Documents added since the last commit
    pub fn uncommitted(&self) -> u64 {
        self.documents_processed - self.last_commit_at.unwrap_or(0)
    }
}

/// Counts documents and bytes and formats progress lines
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    state: BatchState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start: Instant) -> Self {
        Self {
            state: BatchState::new(start),
        }
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn documents(&self) -> u64 {
        self.state.documents_processed
    }

    pub fn elapsed(&self) -> Duration {
        self.state.start.elapsed()
    }

    /// Count one successfully submitted document of `bytes` bytes
    pub fn record_document(&mut self, bytes: u64) {
        self.state.documents_processed += 1;
        self.state.bytes_processed += bytes;
    }

    pub fn record_commit(&mut self) {
        self.state.commits += 1;
        self.state.last_commit_at = Some(self.state.documents_processed);
    }

    /// A status line when the document count is a positive multiple of `threshold`
    pub fn maybe_report(&self, threshold: u64) -> Option<String> {
        let count = self.state.documents_processed;
        if threshold == 0 || count == 0 || count % threshold != 0 {
            return None;
        }
        Some(format!(
            "Indexed {} documents in {} ms",
            count,
            self.elapsed().as_millis()
        ))
    }

    pub fn final_summary(&self) -> String {
        format!(
            "Indexing {} documents took {} ms; total data processed: {} bytes",
            self.state.documents_processed,
            self.elapsed().as_millis(),
            self.state.bytes_processed
        )
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
