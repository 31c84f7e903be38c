//! Document source boundary
//!
//! The inference engine only needs to list collections and stream documents
//! from them. Drivers for real stores implement [`DocumentSource`];
//! [`InMemorySource`] serves in-memory deployments and tests.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::FetchPosition;
use crate::error::{MetadataError, SourceError};
use crate::value::Document;

/// Stream of documents produced by a scan
pub type DocumentStream<'a> = Box<dyn Iterator<Item = Result<Document, SourceError>> + 'a>;

/// Direction of a scan over a collection's natural (insertion) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    Natural,
    Reverse,
}

impl From<FetchPosition> for ScanOrder {
    fn from(position: FetchPosition) -> Self {
        match position {
            FetchPosition::Start => ScanOrder::Natural,
            FetchPosition::End => ScanOrder::Reverse,
        }
    }
}

/// A store of schemaless document collections
pub trait DocumentSource {
    /// Names of all collections, in the store's listing order
    fn list_collections(&self) -> Result<Vec<String>, SourceError>;

    /// Stream at most `limit` documents of `collection` in `order`
    fn scan(
        &self,
        collection: &str,
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<DocumentStream<'_>, SourceError>;
}

/// Identity of a data source derived from its connection string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSourceAddress {
    connection_string: String,
    database: String,
}

impl DataSourceAddress {
    /// Parse `scheme://host[:port]/database[?options]`
    pub fn parse(connection_string: &str) -> Result<Self, MetadataError> {
        let invalid = || MetadataError::InvalidAddress(connection_string.to_string());

        let host_start = connection_string.find("//").ok_or_else(invalid)?;
        if host_start == 0 {
            return Err(invalid());
        }
        let after_host = host_start + 2;
        let path_start = connection_string[after_host..]
            .find('/')
            .map(|i| after_host + i + 1)
            .ok_or_else(invalid)?;
        let rest = &connection_string[path_start..];
        let database = match rest.find('?') {
            Some(end) => &rest[..end],
            None => rest,
        };
        if database.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            connection_string: connection_string.to_string(),
            database: database.to_string(),
        })
    }

    /// Cache key for this source
    pub fn source_id(&self) -> &str {
        &self.connection_string
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Ordered in-memory collections with read instrumentation
#[derive(Debug, Default)]
pub struct InMemorySource {
    collections: Vec<(String, Vec<Document>)>,
    reads: Mutex<HashMap<String, usize>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style collection registration
    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        let name = name.into();
        for doc in documents {
            self.insert(&name, doc);
        }
        if !self.collections.iter().any(|(n, _)| *n == name) {
            self.collections.push((name, Vec::new()));
        }
        self
    }

    /// Append a document, creating the collection if needed
    pub fn insert(&mut self, collection: &str, document: Document) {
        match self.collections.iter_mut().find(|(n, _)| n == collection) {
            Some((_, docs)) => docs.push(document),
            None => self
                .collections
                .push((collection.to_string(), vec![document])),
        }
    }

    /// Build from a JSON object mapping collection names to document arrays
    pub fn from_json(value: &Value) -> Result<Self, MetadataError> {
        let Value::Object(map) = value else {
            return Err(MetadataError::InvalidStructure(
                "expected an object of collections".to_string(),
            ));
        };

        let mut source = Self::new();
        for (name, docs) in map {
            let docs = docs.as_array().ok_or_else(|| {
                MetadataError::InvalidStructure(format!("collection {} is not an array", name))
            })?;
            let documents = docs
                .iter()
                .map(Document::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            source = source.with_collection(name.clone(), documents);
        }
        Ok(source)
    }

    /// Documents handed out by scans of `collection` so far
    pub fn documents_read(&self, collection: &str) -> usize {
        self.reads.lock().get(collection).copied().unwrap_or(0)
    }

    pub fn total_documents_read(&self) -> usize {
        self.reads.lock().values().sum()
    }

    pub fn reset_counters(&self) {
        self.reads.lock().clear();
    }
}

impl DocumentSource for InMemorySource {
    fn list_collections(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.collections.iter().map(|(n, _)| n.clone()).collect())
    }

    fn scan(
        &self,
        collection: &str,
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<DocumentStream<'_>, SourceError> {
        let docs = self
            .collections
            .iter()
            .find(|(n, _)| n == collection)
            .map(|(_, docs)| docs)
            .ok_or_else(|| SourceError::CollectionNotFound(collection.to_string()))?;

        let ordered: Box<dyn Iterator<Item = &Document>> = match order {
            ScanOrder::Natural => Box::new(docs.iter()),
            ScanOrder::Reverse => Box::new(docs.iter().rev()),
        };
        let reads = &self.reads;
        let name = collection.to_string();

        Ok(Box::new(ordered.take(limit.unwrap_or(usize::MAX)).map(
            move |doc| {
                *reads.lock().entry(name.clone()).or_insert(0) += 1;
                Ok(doc.clone())
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DocumentValue;

    fn doc(n: i32) -> Document {
        Document::new().with("n", DocumentValue::Int32(n))
    }

    #[test]
    fn test_parse_address() {
        let address = DataSourceAddress::parse("mongodb://localhost:27017/shop?w=1").unwrap();
        assert_eq!(address.database(), "shop");
        assert_eq!(address.source_id(), "mongodb://localhost:27017/shop?w=1");

        let address = DataSourceAddress::parse("mongodb://a,b/inventory").unwrap();
        assert_eq!(address.database(), "inventory");
    }

    #[test]
    fn test_parse_address_rejects_missing_database() {
        for bad in ["localhost/shop", "mongodb://localhost", "mongodb://localhost/", "//host/db"] {
            let err = DataSourceAddress::parse(bad).unwrap_err();
            assert!(err.is_configuration_error(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_scan_order_and_limit() {
        let source = InMemorySource::new().with_collection("c", vec![doc(1), doc(2), doc(3)]);

        let tail: Vec<_> = source
            .scan("c", ScanOrder::Reverse, Some(2))
            .unwrap()
            .map(|d| d.unwrap().get("n").cloned())
            .collect();
        assert_eq!(
            tail,
            vec![Some(DocumentValue::Int32(3)), Some(DocumentValue::Int32(2))]
        );
        assert_eq!(source.documents_read("c"), 2);
    }

    #[test]
    fn test_reads_counted_lazily() {
        let source = InMemorySource::new().with_collection("c", vec![doc(1), doc(2), doc(3)]);
        let mut stream = source.scan("c", ScanOrder::Natural, None).unwrap();
        stream.next();
        drop(stream);
        assert_eq!(source.documents_read("c"), 1);
    }

    #[test]
    fn test_missing_collection() {
        let source = InMemorySource::new();
        assert!(matches!(
            source.scan("nope", ScanOrder::Natural, None),
            Err(SourceError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let value = serde_json::json!({
            "Products": [{"name": "Bread"}, {"name": "Milk"}],
            "Empty": []
        });
        let source = InMemorySource::from_json(&value).unwrap();
        assert_eq!(source.list_collections().unwrap(), vec!["Products", "Empty"]);

        let bad = serde_json::json!({"Products": [1]});
        assert!(InMemorySource::from_json(&bad).is_err());
    }
}
