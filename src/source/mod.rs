//! Record sources: anything that yields raw corpus records one at a time.

pub mod wikimedia;

pub use wikimedia::{Compression, WikimediaOptions, WikimediaSource};

use crate::error::SourceError;
use std::collections::BTreeMap;

/// One corpus entry as produced by a record source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Unique identifier within the corpus (the Wikipedia page id)
    pub id: String,
    pub title: String,
    pub url: String,
    /// Full body text; large, indexed but normally not stored
    pub body: String,
    /// Source-specific metadata such as the revision date
    pub metadata: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Result of pulling from a source. End of stream is a value, not an error.
#[derive(Debug, PartialEq, Eq)]
pub enum Pull {
    Record(RawRecord),
    Exhausted,
}

/// A sequential supplier of raw records
pub trait RecordSource {
    /// Pull the next record, or `Pull::Exhausted` once the corpus is done
    fn next_record(&mut self) -> Result<Pull, SourceError>;

    /// Raw bytes consumed from the underlying input so far
    fn total_bytes_read(&self) -> u64;

    /// Release the underlying input. Further pulls fail with `SourceError::Closed`.
    fn close(&mut self) -> Result<(), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = RawRecord::new("42")
            .with_title("Answer")
            .with_url("https://en.wikipedia.org/wiki/Answer")
            .with_body("forty two")
            .with_metadata("date", "2024-01-15T10:30:00Z");

        assert_eq!(record.id, "42");
        assert_eq!(record.title, "Answer");
        assert_eq!(record.body, "forty two");
        assert_eq!(record.metadata.get("date").map(String::as_str), Some("2024-01-15T10:30:00Z"));
    }
}
