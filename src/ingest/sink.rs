use super::document::StructuredDocument;
use crate::index::IndexWriter;
use anyhow::Result;

/// Destination of structured documents
pub trait IndexSink {
    fn add_document(&mut self, doc: StructuredDocument) -> Result<()>;

    /// Make everything added so far durable and visible
    fn commit(&mut self) -> Result<()>;

    /// Release the index. Uncommitted documents are discarded.
    fn close(&mut self) -> Result<()>;
}

impl IndexSink for IndexWriter {
    fn add_document(&mut self, doc: StructuredDocument) -> Result<()> {
        IndexWriter::add_document(self, doc).map(|_| ())
    }

    fn commit(&mut self) -> Result<()> {
        IndexWriter::commit(self)
    }

    fn close(&mut self) -> Result<()> {
        IndexWriter::close(self)
    }
}

impl<T: IndexSink + ?Sized> IndexSink for Box<T> {
    fn add_document(&mut self, doc: StructuredDocument) -> Result<()> {
        (**self).add_document(doc)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
