//! In-memory document store with a query log

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::DocumentStore;
use crate::document::{keys_of, Document, Documents, KeySet};
use crate::error::{IncludeError, IncludeResult};

/// A lookup issued against a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub target_class: String,
    pub field: String,
    pub values: KeySet,
}

/// Document store backed by in-memory collections, one per class.
///
/// Every lookup is recorded, which makes it the store of choice for
/// asserting how many queries a preload pass issues.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
    failures: DashMap<String, String>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a class collection
    pub fn insert(&self, class_name: &str, document: Document) {
        self.collections
            .entry(class_name.to_string())
            .or_insert_with(Vec::new)
            .push(document);
    }

    /// Insert several documents into a class collection
    pub fn insert_many(&self, class_name: &str, documents: impl IntoIterator<Item = Document>) {
        self.collections
            .entry(class_name.to_string())
            .or_insert_with(Vec::new)
            .extend(documents);
    }

    /// Make every lookup against `class_name` fail with `message`
    pub fn fail_on(&self, class_name: &str, message: &str) {
        self.failures
            .insert(class_name.to_string(), message.to_string());
    }

    /// Lookups issued so far, in order
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().clone()
    }

    /// Lookups issued so far against one class
    pub fn queries_for(&self, class_name: &str) -> Vec<RecordedQuery> {
        self.queries
            .lock()
            .iter()
            .filter(|query| query.target_class == class_name)
            .cloned()
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn clear_queries(&self) {
        self.queries.lock().clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_where(
        &self,
        target_class: &str,
        field: &str,
        values: &KeySet,
    ) -> IncludeResult<Documents> {
        self.queries.lock().push(RecordedQuery {
            target_class: target_class.to_string(),
            field: field.to_string(),
            values: values.clone(),
        });

        if let Some(message) = self.failures.get(target_class) {
            return Err(IncludeError::lookup(target_class, message.value().as_str()));
        }

        let documents: Documents = self
            .collections
            .get(target_class)
            .map(|collection| {
                collection
                    .iter()
                    .filter(|doc| keys_of(doc, field).iter().any(|key| values.contains(key)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(documents)
    }
}
