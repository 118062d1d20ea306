//! The ingestion pipeline and its pieces.
//!
//! - [`policy`] - which fields are stored, and when to commit
//! - [`document`] - raw record to structured document
//! - [`progress`] - document/byte counters and report lines
//! - [`sink`] - the index sink trait
//! - [`pipeline`] - the orchestrating state machine
//! - [`setup`] - path validation and the end-to-end entry point

pub mod document;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod setup;
pub mod sink;

pub use document::{DocField, StructuredDocument, build};
pub use pipeline::{IngestReport, Outcome, Pipeline, PipelineState};
pub use policy::{CommitPolicy, FieldPolicy};
pub use progress::ProgressTracker;
pub use setup::run_ingest;
pub use sink::IndexSink;
