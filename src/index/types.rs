use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Global document identifier, assigned sequentially from 0 at add time
pub type DocId = u32;

/// Segment identifier (also the segment directory suffix)
pub type SegmentId = u32;

/// Ordinal of a field in the index field table
pub type FieldOrd = u16;

/// On-disk format version written to meta.json
pub const FORMAT_VERSION: u32 = 1;

pub const META_FILE: &str = "meta.json";
pub const META_TMP_FILE: &str = "meta.json.tmp";
pub const LOCK_FILE: &str = "write.lock";
pub const SEGMENTS_DIR: &str = "segments";

pub const TERMS_DICT_FILE: &str = "terms.dict";
pub const POSTINGS_FILE: &str = "terms.postings";
pub const STORE_INDEX_FILE: &str = "store.idx";
pub const STORE_DATA_FILE: &str = "store.bin";

/// Directory name for a segment
pub fn segment_dir_name(segment_id: SegmentId) -> String {
    format!("seg_{:06}", segment_id)
}

/// Per-field schema entry, recorded in meta.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub stored: bool,
    pub indexed: bool,
}

/// A published segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub base_doc: DocId,
    pub doc_count: u32,
}

impl SegmentMeta {
    pub fn contains(&self, doc_id: DocId) -> bool {
        doc_id >= self.base_doc && doc_id - self.base_doc < self.doc_count
    }
}

/// Index metadata stored in meta.json. Only segments listed here are visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    /// Number of commits performed by the writer that created the index
    pub generation: u64,
    pub doc_count: u32,
    pub fields: Vec<FieldInfo>,
    pub segments: Vec<SegmentMeta>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            generation: 0,
            doc_count: 0,
            fields: Vec::new(),
            segments: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Stored fields of one document as returned by the reader
pub type StoredDocument = BTreeMap<String, String>;

/// Writer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Documents buffered in memory before an unpublished segment is flushed
    pub max_buffered_docs: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_buffered_docs: 50_000,
        }
    }
}
