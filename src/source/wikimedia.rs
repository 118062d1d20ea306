//! Wikimedia XML dump reader.
//!
//! Streams `<page>` elements out of a (optionally bzip2 or gzip compressed)
//! MediaWiki export and turns each into a [`RawRecord`]. The page body is the
//! raw wikitext; no markup stripping happens here.

use super::{Pull, RawRecord, RecordSource};
use crate::error::SourceError;
use crate::ingest::policy::{DATE_FIELD, NAMESPACE_FIELD};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const READ_BUFFER_SIZE: usize = 1024 * 1024;
const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org/wiki/";
const IMAGE_TITLE_PATTERN: &str = r"^(?i:image|file)\s*:";

/// Compression of a dump file, detected from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Bzip2,
    Gzip,
    Plain,
}

impl Compression {
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("bz2") => Compression::Bzip2,
            Some("gz") => Compression::Gzip,
            _ => Compression::Plain,
        }
    }
}

/// Knobs for reading a dump
#[derive(Debug, Clone, Default)]
pub struct WikimediaOptions {
    /// Reopen the dump at end of file and keep going
    pub forever: bool,
    /// Keep pages in the Image:/File: namespaces
    pub keep_image_only_docs: bool,
    /// Prefix for article URLs; derived from the dump file name when None
    pub base_url: Option<String>,
}

/// Counts raw bytes pulled from the wrapped reader
struct CountingReader<R> {
    inner: R,
    count: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

type XmlReader = Reader<Box<dyn BufRead>>;

/// Page fields collected from XML events
#[derive(Debug, Default)]
struct PartialPage {
    title: Option<String>,
    id: Option<String>,
    namespace: Option<String>,
    timestamp: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    Title,
    Id,
    Namespace,
    Timestamp,
    Text,
}

impl Capture {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Capture::Title),
            b"id" => Some(Capture::Id),
            b"ns" => Some(Capture::Namespace),
            b"timestamp" => Some(Capture::Timestamp),
            b"text" => Some(Capture::Text),
            _ => None,
        }
    }

    fn assign(self, page: &mut PartialPage, value: String) {
        match self {
            Capture::Title => page.title = Some(value),
            // Revision and contributor ids follow the page id; keep the first
            Capture::Id => {
                if page.id.is_none() {
                    page.id = Some(value.trim().to_string());
                }
            }
            Capture::Namespace => page.namespace = Some(value.trim().to_string()),
            Capture::Timestamp => {
                if page.timestamp.is_none() {
                    page.timestamp = Some(value.trim().to_string());
                }
            }
            Capture::Text => page.text = Some(value),
        }
    }
}

/// Record source over a MediaWiki XML export
pub struct WikimediaSource {
    path: Option<PathBuf>,
    compression: Compression,
    reader: Option<XmlReader>,
    bytes_read: Arc<AtomicU64>,
    buf: Vec<u8>,
    options: WikimediaOptions,
    base_url: String,
    image_title: Regex,
    records_this_pass: u64,
    passes: u64,
}

impl WikimediaSource {
    /// Open a dump file, detecting compression from the extension
    pub fn open(path: impl AsRef<Path>, options: WikimediaOptions) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let compression = Compression::detect(&path);
        let bytes_read = Arc::new(AtomicU64::new(0));
        let input = open_input(&path, compression, &bytes_read)?;

        let base_url = options
            .base_url
            .clone()
            .unwrap_or_else(|| base_url_for(&path));

        Self::build(Some(path), compression, input, bytes_read, options, base_url)
    }

    /// Read uncompressed XML from an arbitrary reader. `forever` has no effect
    /// because the input cannot be reopened.
    pub fn from_reader<R: Read + 'static>(
        input: R,
        options: WikimediaOptions,
    ) -> Result<Self, SourceError> {
        let bytes_read = Arc::new(AtomicU64::new(0));
        let counted = CountingReader {
            inner: input,
            count: Arc::clone(&bytes_read),
        };
        let input: Box<dyn BufRead> = Box::new(BufReader::new(counted));
        let base_url = options
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self::build(None, Compression::Plain, input, bytes_read, options, base_url)
    }

    fn build(
        path: Option<PathBuf>,
        compression: Compression,
        input: Box<dyn BufRead>,
        bytes_read: Arc<AtomicU64>,
        options: WikimediaOptions,
        base_url: String,
    ) -> Result<Self, SourceError> {
        let image_title = Regex::new(IMAGE_TITLE_PATTERN)
            .map_err(|e| SourceError::InvalidFormat(e.to_string()))?;

        Ok(Self {
            path,
            compression,
            reader: Some(Reader::from_reader(input)),
            bytes_read,
            buf: Vec::with_capacity(8192),
            options,
            base_url,
            image_title,
            records_this_pass: 0,
            passes: 1,
        })
    }

    /// Number of passes started over the dump (greater than 1 only in forever mode)
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start the next pass over the dump file
    fn rewind(&mut self) -> Result<(), SourceError> {
        let Some(path) = self.path.as_ref() else {
            return Err(SourceError::InvalidFormat(
                "cannot restart a dump that was not opened from a file".to_string(),
            ));
        };
        let input = open_input(path, self.compression, &self.bytes_read)?;
        self.reader = Some(Reader::from_reader(input));
        self.records_this_pass = 0;
        self.passes += 1;
        tracing::info!("restarting dump {} (pass {})", path.display(), self.passes);
        Ok(())
    }

    fn can_rewind(&self) -> bool {
        self.options.forever && self.path.is_some() && self.records_this_pass > 0
    }

    /// Convert a page to a record, or None when the page is filtered out
    fn page_to_record(&self, page: PartialPage) -> Option<RawRecord> {
        let title = page.title.unwrap_or_default();

        if !self.options.keep_image_only_docs && self.image_title.is_match(&title) {
            tracing::trace!("skipping image page {:?}", title);
            return None;
        }

        let url = if title.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.base_url, title.replace(' ', "_"))
        };

        let mut record = RawRecord::new(page.id.unwrap_or_default())
            .with_title(title)
            .with_url(url)
            .with_body(page.text.unwrap_or_default());

        if let Some(timestamp) = page.timestamp {
            record = record.with_metadata(DATE_FIELD, timestamp);
        }
        if let Some(namespace) = page.namespace {
            record = record.with_metadata(NAMESPACE_FIELD, namespace);
        }

        Some(record)
    }
}

impl RecordSource for WikimediaSource {
    fn next_record(&mut self) -> Result<Pull, SourceError> {
        loop {
            let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;

            match read_page(reader, &mut self.buf)? {
                Some(page) => {
                    if let Some(record) = self.page_to_record(page) {
                        self.records_this_pass += 1;
                        return Ok(Pull::Record(record));
                    }
                }
                None if self.can_rewind() => self.rewind()?,
                None => return Ok(Pull::Exhausted),
            }
        }
    }

    fn total_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}

fn open_input(
    path: &Path,
    compression: Compression,
    counter: &Arc<AtomicU64>,
) -> Result<Box<dyn BufRead>, SourceError> {
    let file = File::open(path)?;
    let counted = CountingReader {
        inner: file,
        count: Arc::clone(counter),
    };

    Ok(match compression {
        Compression::Bzip2 => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiBzDecoder::new(counted),
        )),
        Compression::Gzip => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiGzDecoder::new(counted),
        )),
        Compression::Plain => Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, counted)),
    })
}

/// Article URL prefix derived from a dump name such as `dewiki-latest-pages-articles.xml.bz2`
fn base_url_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let lang = name.find("wiki").map(|pos| &name[..pos]).filter(|lang| {
        !lang.is_empty()
            && lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });

    match lang {
        Some(lang) => format!("https://{}.wikipedia.org/wiki/", lang.replace('_', "-")),
        None => DEFAULT_BASE_URL.to_string(),
    }
}

/// Read events up to the end of the next `<page>`. Returns None at end of input.
fn read_page(reader: &mut XmlReader, buf: &mut Vec<u8>) -> Result<Option<PartialPage>, SourceError> {
    let mut page: Option<PartialPage> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == b"page" {
                    page = Some(PartialPage::default());
                    capture = None;
                } else if page.is_some() {
                    capture = Capture::from_tag(name.as_ref());
                    text.clear();
                }
            }
            Event::Empty(e) => {
                // `<text bytes="0" />` on empty revisions
                if let Some(page) = page.as_mut() {
                    if e.local_name().as_ref() == b"text" {
                        page.text = Some(String::new());
                    }
                }
            }
            Event::Text(e) => {
                if capture.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| SourceError::Xml(err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"page" {
                    if let Some(done) = page.take() {
                        return Ok(Some(done));
                    }
                } else if let (Some(page), Some(field)) = (page.as_mut(), capture.take()) {
                    field.assign(page, std::mem::take(&mut text));
                }
            }
            Event::Eof => {
                return if page.is_some() {
                    Err(SourceError::InvalidFormat(
                        "dump ended inside a <page> element".to_string(),
                    ))
                } else {
                    Ok(None)
                };
            }
            _ => {}
        }
    }
}
