//! Results of an eager loading pass

use crate::document::{Document, KeySet};
use crate::relationships::{Relation, RelationMetadata};

/// Documents fetched by one batched call
#[derive(Debug, Clone)]
pub struct LoadedBatch {
    /// Concrete class the batch was loaded from, when known
    pub class: Option<String>,
    /// Key values sent in the call
    pub values: KeySet,
    pub documents: Vec<Document>,
}

/// Everything loaded for one inclusion
#[derive(Debug, Clone)]
pub struct LoadedRelation<M: Relation = RelationMetadata> {
    /// Relation as declared, before any retargeting
    pub metadata: M,
    /// Parent relation for nested inclusions
    pub from: Option<String>,
    pub batches: Vec<LoadedBatch>,
}

impl<M: Relation> LoadedRelation<M> {
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// All loaded documents, across batches
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.batches.iter().flat_map(|batch| batch.documents.iter())
    }

    pub fn document_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.documents.len()).sum()
    }
}

/// Statistics about the eager loading operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EagerLoadStats {
    /// Number of batched calls issued (store queries or custom loads)
    pub query_count: usize,
    /// Total records loaded
    pub records_loaded: usize,
    /// Number of inclusion levels resolved
    pub depth_loaded: usize,
}

/// Result of an eager loading operation
#[derive(Debug, Clone)]
pub struct EagerLoadResult<M: Relation = RelationMetadata> {
    /// Loaded relations in resolution order, parents before children
    pub(crate) relations: Vec<LoadedRelation<M>>,
    pub stats: EagerLoadStats,
}

impl<M: Relation> Default for EagerLoadResult<M> {
    fn default() -> Self {
        Self {
            relations: Vec::new(),
            stats: EagerLoadStats::default(),
        }
    }
}

impl<M: Relation> EagerLoadResult<M> {
    pub(crate) fn record(&mut self, relation: LoadedRelation<M>) {
        self.stats.query_count += relation.batches.len();
        self.stats.records_loaded += relation.document_count();
        self.relations.push(relation);
    }

    /// Loaded relations in resolution order
    pub fn relations(&self) -> &[LoadedRelation<M>] {
        &self.relations
    }

    /// First loaded relation with the given name
    pub fn relation(&self, name: &str) -> Option<&LoadedRelation<M>> {
        self.relations.iter().find(|relation| relation.name() == name)
    }

    /// Every document loaded under the given relation name
    pub fn documents(&self, name: &str) -> Vec<&Document> {
        self.relations
            .iter()
            .filter(|relation| relation.name() == name)
            .flat_map(|relation| relation.documents())
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.stats.query_count
    }
}
