use super::policy::{BODY_FIELD, FieldPolicy, ID_FIELD, TITLE_FIELD, URL_FIELD};
use crate::error::BuildError;
use crate::source::RawRecord;

/// One field of a structured document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocField {
    pub name: String,
    pub value: String,
    pub stored: bool,
    pub indexed: bool,
}

/// The unit handed to an index sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredDocument {
    fields: Vec<DocField>,
}

impl StructuredDocument {
    pub fn fields(&self) -> &[DocField] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<DocField> {
        self.fields
    }

    pub fn get(&self, name: &str) -> Option<&DocField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Approximate size of the document's text in bytes
    pub fn byte_size(&self) -> u64 {
        self.fields.iter().map(|f| f.value.len() as u64).sum()
    }

    fn push(&mut self, name: &str, value: String, policy: &FieldPolicy) {
        let options = policy.options(name);
        if value.is_empty() || !(options.stored || options.indexed) {
            return;
        }
        self.fields.push(DocField {
            name: name.to_string(),
            value,
            stored: options.stored,
            indexed: options.indexed,
        });
    }
}

/// Convert a record into a document under `policy`.
///
/// Field order is `id`, `title`, `url`, `body`, then metadata by key. Empty
/// optional fields are left out; metadata keys that shadow one of the core
/// fields are ignored.
pub fn build(record: RawRecord, policy: &FieldPolicy) -> Result<StructuredDocument, BuildError> {
    let RawRecord {
        id,
        title,
        url,
        body,
        metadata,
    } = record;

    if id.trim().is_empty() {
        return Err(BuildError::MissingIdentifier { title });
    }

    let mut doc = StructuredDocument {
        fields: Vec::with_capacity(4 + metadata.len()),
    };
    doc.push(ID_FIELD, id, policy);
    doc.push(TITLE_FIELD, title, policy);
    doc.push(URL_FIELD, url, policy);
    doc.push(BODY_FIELD, body, policy);

    for (key, value) in metadata {
        if matches!(key.as_str(), ID_FIELD | TITLE_FIELD | URL_FIELD | BODY_FIELD) {
            continue;
        }
        doc.push(&key, value, policy);
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::policy::DATE_FIELD;

    fn sample_record() -> RawRecord {
        RawRecord::new("1208")
            .with_title("Alan Turing")
            .with_url("https://en.wikipedia.org/wiki/Alan_Turing")
            .with_body("Mathematician and computer scientist.")
            .with_metadata(DATE_FIELD, "2024-03-02T08:15:00Z")
            .with_metadata("ns", "0")
    }

    #[test]
    fn test_field_order_and_flags() {
        let doc = build(sample_record(), &FieldPolicy::default()).unwrap();
        let names: Vec<&str> = doc.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "url", "body", "date", "ns"]);

        let body = doc.get(BODY_FIELD).unwrap();
        assert!(!body.stored);
        assert!(body.indexed);

        let title = doc.get(TITLE_FIELD).unwrap();
        assert!(title.stored);
        assert_eq!(title.value, "Alan Turing");

        assert!(!doc.get("ns").unwrap().stored);
    }

    #[test]
    fn test_missing_identifier() {
        let record = RawRecord::new("  ").with_title("Orphan");
        assert_eq!(
            build(record, &FieldPolicy::default()),
            Err(BuildError::MissingIdentifier {
                title: "Orphan".to_string()
            })
        );
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let doc = build(RawRecord::new("7"), &FieldPolicy::default()).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get(ID_FIELD).unwrap().value, "7");
    }

    #[test]
    fn test_metadata_cannot_shadow_core_fields() {
        let record = RawRecord::new("9")
            .with_title("Real")
            .with_metadata(TITLE_FIELD, "Fake");
        let doc = build(record, &FieldPolicy::default()).unwrap();
        let titles: Vec<&str> = doc
            .fields()
            .iter()
            .filter(|f| f.name == TITLE_FIELD)
            .map(|f| f.value.as_str())
            .collect();
        assert_eq!(titles, vec!["Real"]);
    }

    #[test]
    fn test_deterministic() {
        let policy = FieldPolicy::default();
        let a = build(sample_record(), &policy).unwrap();
        let b = build(sample_record(), &policy).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.byte_size(), b.byte_size());
    }

    #[test]
    fn test_custom_policy_stores_body() {
        let policy = FieldPolicy::new(["id", "body"]);
        let doc = build(sample_record(), &policy).unwrap();
        assert!(doc.get(BODY_FIELD).unwrap().stored);
        assert!(!doc.get(TITLE_FIELD).unwrap().stored);
    }
}
