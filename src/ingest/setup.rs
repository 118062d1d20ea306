//! Validates the corpus and destination, opens both ends and runs the pipeline.

use super::pipeline::{IngestReport, Pipeline};
use crate::config::IngestConfig;
use crate::error::{IngestError, SetupError};
use crate::index::IndexWriter;
use crate::output::Console;
use crate::source::{RecordSource, WikimediaSource};
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// The corpus must be an existing, readable file
pub fn validate_corpus(path: &Path) -> Result<(), SetupError> {
    if !path.exists() {
        return Err(SetupError::InputMissing(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(SetupError::InputNotAFile(path.to_path_buf()));
    }
    File::open(path).map_err(|_| SetupError::InputUnreadable(path.to_path_buf()))?;
    Ok(())
}

/// Create the output directory if needed and check that it is writable
pub fn prepare_output_dir(path: &Path) -> Result<(), SetupError> {
    fs::create_dir_all(path).map_err(|source| {
        if path.exists() && !path.is_dir() {
            SetupError::OutputNotDirectory(path.to_path_buf())
        } else {
            SetupError::OutputUncreatable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if !path.is_dir() {
        return Err(SetupError::OutputNotDirectory(path.to_path_buf()));
    }

    let probe = path.join(format!(".dumpdex-probe-{}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .map_err(|_| SetupError::OutputNotWritable(path.to_path_buf()))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Index `corpus` into a fresh index at `output`
pub fn run_ingest(
    config: &IngestConfig,
    corpus: &Path,
    output: &Path,
    console: Console,
) -> Result<IngestReport, IngestError> {
    config.validate()?;
    let commit = config.commit_policy()?;

    console.info(&format!(
        "Committing after indexing {} docs",
        commit.interval()
    ));
    console.info(&format!(
        "Starting indexing of Wikipedia dump {}",
        corpus.display()
    ));

    validate_corpus(corpus)?;
    prepare_output_dir(output)?;

    let mut source =
        WikimediaSource::open(corpus, config.source_options()).map_err(|source| {
            IngestError::SourceOpen {
                path: corpus.to_path_buf(),
                source,
            }
        })?;
    tracing::info!("reading {} from {}", source.base_url(), corpus.display());

    let writer = match IndexWriter::create(output, config.index_config()) {
        Ok(writer) => writer,
        Err(err) => {
            if let Err(e) = source.close() {
                tracing::warn!("failed to close record source: {}", e);
            }
            return Err(IngestError::SinkOpen {
                path: output.to_path_buf(),
                source: err,
            });
        }
    };

    Pipeline::new(source, writer, config.field_policy(), commit)
        .report_every(config.report_every)
        .console(console)
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_corpus(&dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(err, SetupError::InputMissing(_)));
        assert!(err.to_string().starts_with("Can't find"));
    }

    #[test]
    fn test_directory_is_not_a_corpus() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_corpus(dir.path()),
            Err(SetupError::InputNotAFile(_))
        ));
    }

    #[test]
    fn test_output_dir_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_output_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "x").unwrap();
        let err = prepare_output_dir(&file).unwrap_err();
        assert!(matches!(err, SetupError::OutputNotDirectory(_)));
        assert!(err.to_string().ends_with("is not a directory!"));
    }

    #[test]
    fn test_invalid_config_rejected_before_anything_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index");
        let config = IngestConfig {
            report_every: 0,
            ..IngestConfig::default()
        };
        let err = run_ingest(&config, &dir.path().join("dump.xml"), &out, Console::silent())
            .unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_corpus_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index");
        let err = run_ingest(
            &IngestConfig::default(),
            &dir.path().join("dump.xml"),
            &out,
            Console::silent(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(!out.exists());
    }
}
