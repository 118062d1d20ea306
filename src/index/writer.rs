use crate::index::lock::DirectoryLock;
use crate::index::types::*;
use crate::ingest::document::StructuredDocument;
use crate::utils::{analyze, delta_encode, encode_varint, write_u16_le, write_u32_le, write_u64_le};
use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Documents added since the last flush
struct SegmentBuffer {
    base_doc: DocId,
    /// (field, term) -> ascending doc ids
    postings: BTreeMap<(FieldOrd, String), Vec<DocId>>,
    /// Stored fields per document, in doc id order
    stored: Vec<Vec<(FieldOrd, String)>>,
}

impl SegmentBuffer {
    fn new(base_doc: DocId) -> Self {
        Self {
            base_doc,
            postings: BTreeMap::new(),
            stored: Vec::new(),
        }
    }

    fn doc_count(&self) -> usize {
        self.stored.len()
    }

    fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }
}

/// Index writer that always starts a fresh index.
///
/// Documents are buffered in memory and flushed as segments; segments become
/// visible to readers only when [`IndexWriter::commit`] rewrites `meta.json`.
pub struct IndexWriter {
    index_path: PathBuf,
    config: IndexConfig,
    lock: Option<DirectoryLock>,
    fields: Vec<FieldInfo>,
    field_ords: FxHashMap<String, FieldOrd>,
    next_doc: DocId,
    next_segment: SegmentId,
    buffer: SegmentBuffer,
    /// Segments listed in meta.json
    published: Vec<SegmentMeta>,
    /// Segments flushed to disk since the last commit
    unpublished: Vec<SegmentMeta>,
    generation: u64,
    created_at: u64,
}

impl IndexWriter {
    /// Create a new, empty index at `index_path`, replacing any previous one
    pub fn create(index_path: &Path, config: IndexConfig) -> Result<Self> {
        if config.max_buffered_docs == 0 {
            bail!("max_buffered_docs must be at least 1");
        }

        fs::create_dir_all(index_path)
            .with_context(|| format!("Failed to create {}", index_path.display()))?;

        // Lock before touching anything another writer might own
        let lock = DirectoryLock::acquire(index_path)?;
        remove_previous_index(index_path)?;
        fs::create_dir_all(index_path.join(SEGMENTS_DIR))?;

        Ok(Self {
            index_path: index_path.to_path_buf(),
            config,
            lock: Some(lock),
            fields: Vec::new(),
            field_ords: FxHashMap::default(),
            next_doc: 0,
            next_segment: 1,
            buffer: SegmentBuffer::new(0),
            published: Vec::new(),
            unpublished: Vec::new(),
            generation: 0,
            created_at: unix_now(),
        })
    }

    /// Add a document, returning its doc id
    pub fn add_document(&mut self, doc: StructuredDocument) -> Result<DocId> {
        self.ensure_open()?;

        let doc_id = self.next_doc;
        let next_doc = doc_id
            .checked_add(1)
            .context("Document id space exhausted")?;

        let mut stored = Vec::new();
        for field in doc.into_fields() {
            let ord = self.field_ord(&field.name, field.stored, field.indexed)?;
            if field.indexed {
                for token in analyze(&field.value) {
                    let ids = self.buffer.postings.entry((ord, token)).or_default();
                    if ids.last() != Some(&doc_id) {
                        ids.push(doc_id);
                    }
                }
            }
            if field.stored {
                stored.push((ord, field.value));
            }
        }
        self.buffer.stored.push(stored);
        self.next_doc = next_doc;

        if self.buffer.doc_count() >= self.config.max_buffered_docs {
            self.flush()?;
        }

        Ok(doc_id)
    }

    /// Make every document added so far durable and visible to readers
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush()?;

        let mut segments = self.published.clone();
        segments.extend(self.unpublished.iter().copied());

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            generation: self.generation + 1,
            doc_count: self.next_doc,
            fields: self.fields.clone(),
            segments,
            created_at: self.created_at,
            updated_at: unix_now(),
        };
        write_meta(&self.index_path, &meta)?;

        tracing::debug!(
            "commit generation {}: {} documents in {} segments",
            meta.generation,
            meta.doc_count,
            meta.segments.len()
        );

        self.generation = meta.generation;
        self.published = meta.segments;
        self.unpublished.clear();
        Ok(())
    }

    /// Release the index without committing. Segments flushed since the last
    /// commit are deleted. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.lock.is_none() {
            return Ok(());
        }

        self.buffer = SegmentBuffer::new(self.next_doc);

        let mut result = Ok(());
        for segment in self.unpublished.drain(..) {
            let path = segment_path(&self.index_path, segment.id);
            if let Err(e) = fs::remove_dir_all(&path) {
                result = Err(e).with_context(|| {
                    format!("Failed to remove uncommitted segment {}", path.display())
                });
            }
        }

        self.lock = None;
        result
    }

    pub fn is_open(&self) -> bool {
        self.lock.is_some()
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Documents added, committed or not
    pub fn doc_count(&self) -> u32 {
        self.next_doc
    }

    /// Documents still held in memory
    pub fn buffered_docs(&self) -> usize {
        self.buffer.doc_count()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lock.is_none() {
            bail!("Index writer for {} is closed", self.index_path.display());
        }
        Ok(())
    }

    /// Get or register a field ordinal
    fn field_ord(&mut self, name: &str, stored: bool, indexed: bool) -> Result<FieldOrd> {
        if let Some(&ord) = self.field_ords.get(name) {
            let info = &mut self.fields[ord as usize];
            info.stored |= stored;
            info.indexed |= indexed;
            return Ok(ord);
        }

        let ord = FieldOrd::try_from(self.fields.len()).context("Too many distinct fields")?;
        self.fields.push(FieldInfo {
            name: name.to_string(),
            stored,
            indexed,
        });
        self.field_ords.insert(name.to_string(), ord);
        Ok(ord)
    }

    /// Write buffered documents as a new, unpublished segment
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let segment_id = self.next_segment;
        let path = segment_path(&self.index_path, segment_id);
        let buffer = std::mem::replace(&mut self.buffer, SegmentBuffer::new(self.next_doc));

        if let Err(e) = write_segment(&path, &buffer) {
            let _ = fs::remove_dir_all(&path);
            return Err(e).with_context(|| format!("Failed to write segment {}", path.display()));
        }

        let segment = SegmentMeta {
            id: segment_id,
            base_doc: buffer.base_doc,
            doc_count: u32::try_from(buffer.doc_count()).context("Segment too large")?,
        };
        tracing::debug!(
            "flushed segment {} ({} documents, {} terms)",
            segment_id,
            segment.doc_count,
            buffer.postings.len()
        );

        self.unpublished.push(segment);
        self.next_segment += 1;
        Ok(())
    }
}

fn segment_path(index_path: &Path, segment_id: SegmentId) -> PathBuf {
    index_path
        .join(SEGMENTS_DIR)
        .join(segment_dir_name(segment_id))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Remove metadata and segments of an index previously written here
fn remove_previous_index(index_path: &Path) -> Result<()> {
    for name in [META_FILE, META_TMP_FILE] {
        match fs::remove_file(index_path.join(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove old {}", name));
            }
        }
    }

    let segments = index_path.join(SEGMENTS_DIR);
    if segments.exists() {
        fs::remove_dir_all(&segments).context("Failed to remove old segments")?;
    }
    Ok(())
}

/// Flush and fsync a buffered file
fn finish(writer: BufWriter<File>) -> Result<()> {
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn write_segment(segment_path: &Path, buffer: &SegmentBuffer) -> Result<()> {
    fs::create_dir_all(segment_path)?;
    write_terms(segment_path, &buffer.postings)?;
    write_stored(segment_path, &buffer.stored)?;
    Ok(())
}

/// Write the term dictionary and postings
fn write_terms(
    segment_path: &Path,
    postings: &BTreeMap<(FieldOrd, String), Vec<DocId>>,
) -> Result<()> {
    let mut dict_file = BufWriter::new(File::create(segment_path.join(TERMS_DICT_FILE))?);
    let mut postings_file = BufWriter::new(File::create(segment_path.join(POSTINGS_FILE))?);

    let count = u32::try_from(postings.len()).context("Too many terms in segment")?;
    write_u32_le(&mut dict_file, count)?;

    let mut postings_offset: u64 = 0;
    let mut encoded = Vec::new();

    for ((field, term), doc_ids) in postings {
        encoded.clear();
        delta_encode(doc_ids, &mut encoded);

        // Dictionary entry: field, term (length-prefixed), offset, length, doc_freq
        let term_bytes = term.as_bytes();
        write_u16_le(&mut dict_file, *field)?;
        write_u16_le(&mut dict_file, u16::try_from(term_bytes.len())?)?;
        dict_file.write_all(term_bytes)?;
        write_u64_le(&mut dict_file, postings_offset)?;
        write_u32_le(&mut dict_file, u32::try_from(encoded.len())?)?;
        write_u32_le(&mut dict_file, u32::try_from(doc_ids.len())?)?;

        postings_file.write_all(&encoded)?;
        postings_offset += encoded.len() as u64;
    }

    finish(dict_file)?;
    finish(postings_file)?;
    Ok(())
}

/// Write stored fields: `store.bin` records plus `store.idx` offsets (doc_count + 1 entries)
fn write_stored(segment_path: &Path, stored: &[Vec<(FieldOrd, String)>]) -> Result<()> {
    let mut index_file = BufWriter::new(File::create(segment_path.join(STORE_INDEX_FILE))?);
    let mut data_file = BufWriter::new(File::create(segment_path.join(STORE_DATA_FILE))?);

    let mut offset: u64 = 0;
    let mut record = Vec::new();

    for fields in stored {
        record.clear();
        encode_varint(fields.len() as u64, &mut record);
        for (ord, value) in fields {
            encode_varint(u64::from(*ord), &mut record);
            encode_varint(value.len() as u64, &mut record);
            record.extend_from_slice(value.as_bytes());
        }

        write_u64_le(&mut index_file, offset)?;
        data_file.write_all(&record)?;
        offset += record.len() as u64;
    }
    write_u64_le(&mut index_file, offset)?;

    finish(index_file)?;
    finish(data_file)?;
    Ok(())
}

/// Atomically replace meta.json
fn write_meta(index_path: &Path, meta: &IndexMeta) -> Result<()> {
    let tmp_path = index_path.join(META_TMP_FILE);
    let meta_path = index_path.join(META_FILE);

    let mut file = BufWriter::new(
        File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?,
    );
    serde_json::to_writer_pretty(&mut file, meta)?;
    finish(file)?;

    fs::rename(&tmp_path, &meta_path)
        .with_context(|| format!("Failed to publish {}", meta_path.display()))?;
    sync_dir(index_path)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> Result<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> Result<()> {
    Ok(())
}
