use std::collections::BTreeSet;
use std::num::NonZeroU64;

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const URL_FIELD: &str = "url";
pub const BODY_FIELD: &str = "body";
pub const DATE_FIELD: &str = "date";
pub const NAMESPACE_FIELD: &str = "ns";

/// Fields stored (retrievable) by default. Everything else is index-only.
pub const DEFAULT_STORED_FIELDS: &[&str] = &[ID_FIELD, TITLE_FIELD, URL_FIELD, DATE_FIELD];

/// Per-field persistence flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOptions {
    pub stored: bool,
    pub indexed: bool,
}

/// Which record fields are stored versus indexed-only.
///
/// Every field is indexed; a stored field is therefore always indexed too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    stored: BTreeSet<String>,
}

impl FieldPolicy {
    pub fn new<I, S>(stored_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stored: stored_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the original value of `field` is kept for retrieval
    pub fn store(&self, field: &str) -> bool {
        self.stored.contains(field)
    }

    /// Whether `field` is searchable
    pub fn index(&self, _field: &str) -> bool {
        true
    }

    pub fn options(&self, field: &str) -> FieldOptions {
        FieldOptions {
            stored: self.store(field),
            indexed: self.index(field),
        }
    }

    pub fn stored_fields(&self) -> impl Iterator<Item = &str> {
        self.stored.iter().map(String::as_str)
    }
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STORED_FIELDS.iter().copied())
    }
}

/// Number of documents between commits. A value of 1 commits every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPolicy {
    interval: NonZeroU64,
}

impl CommitPolicy {
    pub const DEFAULT_INTERVAL: u64 = 1_000_000;

    /// None for an interval of 0
    pub fn new(interval: u64) -> Option<Self> {
        NonZeroU64::new(interval).map(|interval| Self { interval })
    }

    pub fn interval(&self) -> u64 {
        self.interval.get()
    }

    /// True when `documents` is a positive multiple of the interval
    pub fn is_boundary(&self, documents: u64) -> bool {
        documents > 0 && documents % self.interval.get() == 0
    }
}

impl Default for CommitPolicy {
    fn default() -> Self {
        const DEFAULT: NonZeroU64 = match NonZeroU64::new(CommitPolicy::DEFAULT_INTERVAL) {
            Some(interval) => interval,
            None => NonZeroU64::MIN,
        };
        Self { interval: DEFAULT }
    }
}
