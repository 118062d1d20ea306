use super::document::build;
use super::policy::{CommitPolicy, FieldPolicy};
use super::progress::ProgressTracker;
use super::sink::IndexSink;
use crate::error::IngestError;
use crate::output::Console;
use crate::source::{Pull, RecordSource};
use std::time::Duration;

/// Progress line cadence, independent of the commit interval
pub const DEFAULT_REPORT_EVERY: u64 = 5_000;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Lifecycle of a pipeline. Terminated is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    Running,
    Draining,
    Terminated(Outcome),
}

/// Totals of a successful run
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: u64,
    /// Sum of document text sizes
    pub bytes_processed: u64,
    /// Raw bytes consumed from the corpus file
    pub source_bytes_read: u64,
    /// Commit invocations, including the final one
    pub commits: u64,
    pub elapsed: Duration,
    pub summary: String,
}

/// Pulls records from a source, builds documents and feeds them to a sink,
/// committing every `commit.interval()` documents.
pub struct Pipeline<S: RecordSource, K: IndexSink> {
    source: S,
    sink: K,
    policy: FieldPolicy,
    commit: CommitPolicy,
    report_every: u64,
    tracker: ProgressTracker,
    state: PipelineState,
    console: Console,
}

impl<S: RecordSource, K: IndexSink> Pipeline<S, K> {
    /// Both `source` and `sink` must already be open
    pub fn new(source: S, sink: K, policy: FieldPolicy, commit: CommitPolicy) -> Self {
        Self {
            source,
            sink,
            policy,
            commit,
            report_every: DEFAULT_REPORT_EVERY,
            tracker: ProgressTracker::new(),
            state: PipelineState::Initializing,
            console: Console::silent(),
        }
    }

    /// Emit a progress line every `n` documents (0 disables)
    pub fn report_every(mut self, n: u64) -> Self {
        self.report_every = n;
        self
    }

    pub fn console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    /// Run to completion. A pipeline runs once; later calls fail.
    pub fn run(&mut self) -> Result<IngestReport, IngestError> {
        if self.state != PipelineState::Initializing {
            return Err(IngestError::AlreadyRun);
        }
        self.state = PipelineState::Running;

        if let Err(err) = self.ingest() {
            return Err(self.abort(err));
        }

        self.state = PipelineState::Draining;
        self.drain()
    }

    /// The Running state: pull until exhaustion
    fn ingest(&mut self) -> Result<(), IngestError> {
        loop {
            let documents = self.tracker.documents();

            let record = match self.source.next_record() {
                Ok(Pull::Record(record)) => record,
                Ok(Pull::Exhausted) => return Ok(()),
                Err(source) => return Err(IngestError::Source { documents, source }),
            };

            let doc = build(record, &self.policy)
                .map_err(|source| IngestError::Build { documents, source })?;
            let bytes = doc.byte_size();

            self.sink
                .add_document(doc)
                .map_err(|source| IngestError::AddDocument {
                    document: documents + 1,
                    source,
                })?;

            self.tracker.record_document(bytes);
            if let Some(line) = self.tracker.maybe_report(self.report_every) {
                self.console.progress(&line);
            }

            let documents = self.tracker.documents();
            if self.commit.is_boundary(documents) {
                self.sink
                    .commit()
                    .map_err(|source| IngestError::Commit { documents, source })?;
                self.tracker.record_commit();
                self.console.committed();
            }
        }
    }

    /// The Draining state: final commit, then release both ends
    fn drain(&mut self) -> Result<IngestReport, IngestError> {
        let spinner = self.console.spinner("Finalizing index...");
        let documents = self.tracker.documents();

        if let Err(source) = self.sink.commit() {
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }
            return Err(self.abort(IngestError::Commit { documents, source }));
        }
        self.tracker.record_commit();

        let source_bytes_read = self.source.total_bytes_read();
        let source_closed = self.source.close();
        let sink_closed = self.sink.close();

        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }

        let closed = source_closed
            .map_err(|e| IngestError::Close {
                what: "record source",
                source: e.into(),
            })
            .and(sink_closed.map_err(|source| IngestError::Close {
                what: "index",
                source,
            }));
        if let Err(err) = closed {
            self.state = PipelineState::Terminated(Outcome::Failure);
            return Err(err);
        }

        let state = self.tracker.state();
        let summary = self.tracker.final_summary();
        self.console.summary(&summary);
        self.state = PipelineState::Terminated(Outcome::Success);

        Ok(IngestReport {
            documents: state.documents_processed,
            bytes_processed: state.bytes_processed,
            source_bytes_read,
            commits: state.commits,
            elapsed: self.tracker.elapsed(),
            summary,
        })
    }

    /// Failure path: no commit, best-effort release of both ends
    fn abort(&mut self, err: IngestError) -> IngestError {
        tracing::debug!(
            "aborting after {} documents, {} uncommitted",
            self.tracker.documents(),
            self.tracker.state().uncommitted()
        );

        if let Err(e) = self.source.close() {
            tracing::warn!("failed to close record source: {}", e);
        }
        if let Err(e) = self.sink.close() {
            tracing::warn!("failed to close index: {:#}", e);
        }

        self.state = PipelineState::Terminated(Outcome::Failure);
        err
    }
}
