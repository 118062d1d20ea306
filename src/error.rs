//! Error types for the ingestion pipeline and its collaborators.
//!
//! Index engine internals report `anyhow::Error`; everything that crosses the
//! pipeline boundary is one of the typed errors below so the binary can map a
//! failure to a stable exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a record source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Invalid dump format: {0}")]
    InvalidFormat(String),

    #[error("record source is closed")]
    Closed,
}

impl From<quick_xml::Error> for SourceError {
    fn from(e: quick_xml::Error) -> Self {
        SourceError::Xml(e.to_string())
    }
}

/// A record could not be turned into a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("record has no identifier (title: {title:?})")]
    MissingIdentifier { title: String },
}

/// Problems detected before the index is opened
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Can't find {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Can't read {}", .0.display())]
    InputUnreadable(PathBuf),

    #[error("{} is not a file", .0.display())]
    InputNotAFile(PathBuf),

    #[error("couldn't create {}: {source}", .path.display())]
    OutputUncreatable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a directory!", .0.display())]
    OutputNotDirectory(PathBuf),

    #[error("Can't write to {}", .0.display())]
    OutputNotWritable(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Terminal failure of an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("failed to open dump {}: {source}", .path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("failed to open index at {}: {source:#}", .path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read record after {documents} documents: {source}")]
    Source {
        documents: u64,
        #[source]
        source: SourceError,
    },

    #[error("invalid record after {documents} documents: {source}")]
    Build {
        documents: u64,
        #[source]
        source: BuildError,
    },

    #[error("failed to add document {document}: {source:#}")]
    AddDocument {
        document: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("commit failed after {documents} documents: {source:#}")]
    Commit {
        documents: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to close {what}: {source:#}")]
    Close {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("pipeline has already run")]
    AlreadyRun,
}

impl IngestError {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> u8 {
        match self {
            IngestError::Setup(SetupError::InputMissing(_))
            | IngestError::Setup(SetupError::InputUnreadable(_))
            | IngestError::Setup(SetupError::InputNotAFile(_))
            | IngestError::SourceOpen { .. } => 3,
            IngestError::Setup(SetupError::OutputUncreatable { .. })
            | IngestError::Setup(SetupError::OutputNotDirectory(_))
            | IngestError::Setup(SetupError::OutputNotWritable(_))
            | IngestError::SinkOpen { .. } => 4,
            IngestError::Setup(SetupError::Config(_)) => 5,
            IngestError::Source { .. }
            | IngestError::Build { .. }
            | IngestError::AddDocument { .. }
            | IngestError::AlreadyRun => 6,
            IngestError::Commit { .. } => 7,
            IngestError::Close { .. } => 8,
        }
    }
}
