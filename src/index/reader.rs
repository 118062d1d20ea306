use crate::index::types::*;
use crate::utils::{decode_varint, delta_decode, normalize_term, read_u16_le, read_u32_le, read_u64_le};
use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Term dictionary entry
struct TermDictEntry {
    field: FieldOrd,
    term: String,
    offset: u64,
    length: u32,
    doc_freq: u32,
}

/// Term dictionary, sorted by (field, term)
struct TermDict {
    entries: Vec<TermDictEntry>,
}

impl TermDict {
    fn lookup(&self, field: FieldOrd, term: &str) -> Option<&TermDictEntry> {
        self.entries
            .binary_search_by(|e| (e.field, e.term.as_str()).cmp(&(field, term)))
            .ok()
            .map(|i| &self.entries[i])
    }
}

/// Reader for a single segment
struct SegmentReader {
    meta: SegmentMeta,
    terms: TermDict,
    postings: Option<Mmap>,
    /// doc_count + 1 offsets into the store data
    store_offsets: Vec<u64>,
    store: Option<Mmap>,
}

impl SegmentReader {
    fn open(segment_path: &Path, meta: SegmentMeta) -> Result<Self> {
        let terms = read_term_dict(segment_path)?;
        let postings = map_file(&segment_path.join(POSTINGS_FILE))?;
        let store_offsets = read_store_offsets(segment_path)?;
        let store = map_file(&segment_path.join(STORE_DATA_FILE))?;

        if store_offsets.len() != meta.doc_count as usize + 1 {
            bail!(
                "Segment {} lists {} documents but stores {}",
                meta.id,
                meta.doc_count,
                store_offsets.len().saturating_sub(1)
            );
        }

        Ok(Self {
            meta,
            terms,
            postings,
            store_offsets,
            store,
        })
    }

    fn term_docs(&self, field: FieldOrd, term: &str) -> RoaringBitmap {
        let Some(entry) = self.terms.lookup(field, term) else {
            return RoaringBitmap::new();
        };
        let Some(postings) = &self.postings else {
            return RoaringBitmap::new();
        };

        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        if end > postings.len() {
            return RoaringBitmap::new();
        }
        delta_decode(&postings[start..end]).into_iter().collect()
    }

    fn doc_freq(&self, field: FieldOrd, term: &str) -> u32 {
        self.terms
            .lookup(field, term)
            .map(|e| e.doc_freq)
            .unwrap_or(0)
    }

    /// Stored (field ordinal, value) pairs for a document of this segment
    fn stored(&self, doc_id: DocId) -> Result<Vec<(FieldOrd, String)>> {
        let local = (doc_id - self.meta.base_doc) as usize;
        let start = self.store_offsets[local] as usize;
        let end = self.store_offsets[local + 1] as usize;
        let data = match &self.store {
            Some(store) if end <= store.len() && start <= end => &store[start..end],
            Some(_) => bail!("Stored fields of document {} out of range", doc_id),
            None if start == end => &[][..],
            None => bail!("Stored fields of document {} missing", doc_id),
        };
        decode_stored(data).with_context(|| format!("Corrupt stored fields for document {}", doc_id))
    }
}

/// Reader over the last committed state of an index
pub struct IndexReader {
    index_path: PathBuf,
    meta: IndexMeta,
    segments: Vec<SegmentReader>,
}

impl IndexReader {
    /// Open the index at `index_path`. Fails if nothing was ever committed.
    pub fn open(index_path: &Path) -> Result<Self> {
        let meta_path = index_path.join(META_FILE);
        if !meta_path.exists() {
            bail!("No committed index found at {}", index_path.display());
        }

        let content = fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read {}", meta_path.display()))?;
        let meta: IndexMeta = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", meta_path.display()))?;

        if meta.version != FORMAT_VERSION {
            bail!(
                "Unsupported index format version {} (expected {})",
                meta.version,
                FORMAT_VERSION
            );
        }

        let segments_dir = index_path.join(SEGMENTS_DIR);
        let segments = meta
            .segments
            .par_iter()
            .map(|&segment| {
                let path = segments_dir.join(segment_dir_name(segment.id));
                SegmentReader::open(&path, segment)
                    .with_context(|| format!("Failed to open segment {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index_path: index_path.to_path_buf(),
            meta,
            segments,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Number of committed documents
    pub fn num_docs(&self) -> u32 {
        self.meta.doc_count
    }

    pub fn generation(&self) -> u64 {
        self.meta.generation
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.meta.fields
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn field_ord(&self, name: &str) -> Option<FieldOrd> {
        self.meta
            .fields
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| FieldOrd::try_from(i).ok())
    }

    /// Documents whose `field` contains `term` (normalized like indexed text)
    pub fn term_docs(&self, field: &str, term: &str) -> RoaringBitmap {
        let mut results = RoaringBitmap::new();
        let (Some(ord), Some(term)) = (self.field_ord(field), normalize_term(term)) else {
            return results;
        };
        for segment in &self.segments {
            results |= segment.term_docs(ord, &term);
        }
        results
    }

    /// Number of documents containing `term` in `field`
    pub fn doc_freq(&self, field: &str, term: &str) -> u32 {
        let (Some(ord), Some(term)) = (self.field_ord(field), normalize_term(term)) else {
            return 0;
        };
        self.segments.iter().map(|s| s.doc_freq(ord, &term)).sum()
    }

    /// Stored fields of a document, or None if the id was never committed
    pub fn doc(&self, doc_id: DocId) -> Result<Option<StoredDocument>> {
        let Some(segment) = self.segments.iter().find(|s| s.meta.contains(doc_id)) else {
            return Ok(None);
        };

        let mut doc = StoredDocument::new();
        for (ord, value) in segment.stored(doc_id)? {
            let info = self
                .meta
                .fields
                .get(ord as usize)
                .with_context(|| format!("Unknown field ordinal {}", ord))?;
            doc.insert(info.name.clone(), value);
        }
        Ok(Some(doc))
    }

    /// Doc id of the document whose `id` field equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<DocId> {
        self.term_docs(crate::ingest::policy::ID_FIELD, id)
            .iter()
            .next()
    }
}

/// mmap a file; None for missing or empty files, which cannot be mapped
fn map_file(path: &Path) -> Result<Option<Mmap>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Some(mmap))
}

fn read_term_dict(segment_path: &Path) -> Result<TermDict> {
    let mut file = BufReader::new(File::open(segment_path.join(TERMS_DICT_FILE))?);

    let count = read_u32_le(&mut file)? as usize;
    let mut entries = Vec::with_capacity(count);

    for _ in 0..count {
        let field = read_u16_le(&mut file)?;
        let term_len = read_u16_le(&mut file)? as usize;
        let mut term_bytes = vec![0u8; term_len];
        file.read_exact(&mut term_bytes)?;
        let term = String::from_utf8(term_bytes).context("Term is not valid UTF-8")?;
        let offset = read_u64_le(&mut file)?;
        let length = read_u32_le(&mut file)?;
        let doc_freq = read_u32_le(&mut file)?;

        entries.push(TermDictEntry {
            field,
            term,
            offset,
            length,
            doc_freq,
        });
    }

    // Written from a BTreeMap, so already sorted
    Ok(TermDict { entries })
}

fn read_store_offsets(segment_path: &Path) -> Result<Vec<u64>> {
    let bytes = fs::read(segment_path.join(STORE_INDEX_FILE))?;
    if bytes.len() % 8 != 0 {
        bail!("Truncated store index");
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            u64::from_le_bytes(buf)
        })
        .collect())
}

fn next_varint(data: &mut &[u8]) -> Result<u64> {
    let (value, used) = decode_varint(data).context("Truncated varint")?;
    *data = &data[used..];
    Ok(value)
}

fn decode_stored(mut data: &[u8]) -> Result<Vec<(FieldOrd, String)>> {
    let count = next_varint(&mut data)?;
    let mut fields = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let ord = FieldOrd::try_from(next_varint(&mut data)?)?;
        let len = next_varint(&mut data)? as usize;
        if len > data.len() {
            bail!("Stored value overruns record");
        }
        let value = std::str::from_utf8(&data[..len])?.to_string();
        data = &data[len..];
        fields.push((ord, value));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::IndexWriter;
    use crate::ingest::document::build;
    use crate::ingest::policy::{DATE_FIELD, FieldPolicy};
    use crate::source::RawRecord;

    fn build_index(dir: &Path) {
        let mut writer = IndexWriter::create(dir, IndexConfig { max_buffered_docs: 2 }).unwrap();
        let records = [
            RawRecord::new("10")
                .with_title("Alan Turing")
                .with_url("https://en.wikipedia.org/wiki/Alan_Turing")
                .with_body("Turing machine and computability")
                .with_metadata(DATE_FIELD, "2024-01-01T00:00:00Z"),
            RawRecord::new("20")
                .with_title("Ada Lovelace")
                .with_body("Analytical engine notes"),
            RawRecord::new("30")
                .with_title("Charles Babbage")
                .with_body("Analytical engine and difference engine"),
        ];
        for record in records {
            writer
                .add_document(build(record, &FieldPolicy::default()).unwrap())
                .unwrap();
        }
        writer.commit().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_term_lookup_across_segments() {
        let dir = tempfile::tempdir().unwrap();
        build_index(dir.path());
        let reader = IndexReader::open(dir.path()).unwrap();

        assert_eq!(reader.segment_count(), 2);
        let engine: Vec<u32> = reader.term_docs("body", "Engine").iter().collect();
        assert_eq!(engine, vec![1, 2]);
        assert_eq!(reader.doc_freq("body", "engine"), 2);
        assert_eq!(reader.doc_freq("body", "the"), 0);
        assert!(reader.term_docs("missing", "engine").is_empty());
    }

    #[test]
    fn test_stored_fields_exclude_body() {
        let dir = tempfile::tempdir().unwrap();
        build_index(dir.path());
        let reader = IndexReader::open(dir.path()).unwrap();

        let doc = reader.doc(0).unwrap().unwrap();
        assert_eq!(doc.get("id").map(String::as_str), Some("10"));
        assert_eq!(doc.get("title").map(String::as_str), Some("Alan Turing"));
        assert_eq!(doc.get("date").map(String::as_str), Some("2024-01-01T00:00:00Z"));
        assert!(!doc.contains_key("body"));

        let body = reader.fields().iter().find(|f| f.name == "body").unwrap();
        assert!(body.indexed);
        assert!(!body.stored);

        assert!(reader.doc(3).unwrap().is_none());
    }

    #[test]
    fn test_find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        build_index(dir.path());
        let reader = IndexReader::open(dir.path()).unwrap();

        assert_eq!(reader.find_by_id("30"), Some(2));
        assert_eq!(reader.find_by_id("40"), None);
    }

    #[test]
    fn test_open_without_commit_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IndexReader::open(dir.path()).is_err());
    }

    #[test]
    fn test_decode_stored_rejects_overrun() {
        assert!(decode_stored(&[1, 0, 5, b'a']).is_err());
        assert_eq!(
            decode_stored(&[1, 2, 2, b'h', b'i']).unwrap(),
            vec![(2, "hi".to_string())]
        );
    }
}
