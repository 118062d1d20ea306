//! # dumpdex
//!
//! Bulk-loads a Wikipedia XML dump into a segment-based full-text index,
//! committing at a fixed document interval.
//!
//! ## Architecture
//!
//! - [`source`] - record sources (the MediaWiki dump reader)
//! - [`ingest`] - document building, progress and the pipeline state machine
//! - [`index`] - the on-disk index: writer, reader, directory lock
//! - [`config`] - settings file and defaults
//! - [`output`] - operator console output
//! - [`error`] - error types and exit codes
//!
//! ## Quick Start
//!
//! ```no_run
//! use dumpdex::config::IngestConfig;
//! use dumpdex::ingest::run_ingest;
//! use dumpdex::output::Console;
//! use std::path::Path;
//!
//! let config = IngestConfig::default();
//! let report = run_ingest(
//!     &config,
//!     Path::new("enwiki-latest-pages-articles.xml.bz2"),
//!     Path::new("index"),
//!     Console::default(),
//! )
//! .unwrap();
//! println!("{} documents", report.documents);
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod output;
pub mod source;
pub mod utils;
