use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use futures::future::try_join_all;

use super::result::{EagerLoadResult, LoadedBatch, LoadedRelation};
use crate::config::EagerLoadConfig;
use crate::document::{collect_keys, keys_of, string_field, Document, KeySet};
use crate::error::{IncludeError, IncludeResult};
use crate::inclusion::{Inclusion, Inclusions};
use crate::relationships::{Relation, RelationMetadata};
use crate::store::DocumentStore;

/// Resolves a set of inclusions against root documents, one batched call
/// per relation and level (one per concrete class for polymorphic
/// belongs-to relations).
pub struct EagerLoader<S, M: Relation = RelationMetadata> {
    store: S,
    inclusions: Inclusions<M>,
    config: EagerLoadConfig,
    /// Class of the root documents
    model: Option<String>,
}

impl<S: DocumentStore, M: Relation> EagerLoader<S, M> {
    /// Create an eager loader with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, EagerLoadConfig::default())
    }

    /// Create an eager loader with custom configuration
    pub fn with_config(store: S, config: EagerLoadConfig) -> Self {
        Self {
            store,
            inclusions: Inclusions::new(),
            config,
            model: None,
        }
    }

    /// Name the class of the root documents. Required to resolve
    /// polymorphic has-one and has-many relations declared on the roots,
    /// whose targets record the owner class in their type column.
    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Request a relation; duplicates of an already requested relation and
    /// nesting path are dropped.
    pub fn include(mut self, inclusion: Inclusion<M>) -> Self {
        self.inclusions.push(inclusion);
        self
    }

    pub fn inclusions(&self) -> &Inclusions<M> {
        &self.inclusions
    }

    pub fn config(&self) -> &EagerLoadConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Load every included relation for `roots`.
    ///
    /// Any failing batch aborts the whole pass.
    pub async fn load(&self, roots: &[Document]) -> IncludeResult<EagerLoadResult<M>> {
        let levels = self.plan()?;
        let mut result = EagerLoadResult::default();

        tracing::debug!(
            "Eager loading {} relations in {} levels for {} documents",
            self.inclusions.len(),
            levels.len(),
            roots.len()
        );

        for (depth, level) in levels.iter().enumerate() {
            tracing::trace!("Resolving level {} ({} relations)", depth, level.len());

            let loads: Vec<_> = level
                .iter()
                .map(|inclusion| {
                    let sources: Vec<&Document> = match inclusion.from() {
                        None => roots.iter().collect(),
                        Some(parent) => result.documents(parent),
                    };
                    self.resolve(inclusion, sources)
                })
                .collect();
            let loaded = self.run(loads).await?;

            for relation in loaded {
                result.record(relation);
            }
            result.stats.depth_loaded = depth + 1;
        }

        tracing::debug!(
            "Eager loading finished: {} queries, {} records",
            result.stats.query_count,
            result.stats.records_loaded
        );
        Ok(result)
    }

    /// Order inclusions into levels: roots first, then each nested
    /// inclusion one level after its parent.
    fn plan(&self) -> IncludeResult<Vec<Vec<&Inclusion<M>>>> {
        let included: HashSet<&str> = self
            .inclusions
            .iter()
            .map(|inclusion| inclusion.name())
            .collect();

        for inclusion in self.inclusions.iter() {
            if let Some(parent) = inclusion.from() {
                if !included.contains(parent) {
                    return Err(IncludeError::Configuration(format!(
                        "Relation '{}' is included from '{}', which is not included",
                        inclusion.name(),
                        parent
                    )));
                }
            }
            self.owner_class(inclusion)?;
        }

        let mut resolved: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Inclusion<M>> = self.inclusions.iter().collect();
        let mut levels = Vec::new();

        while !pending.is_empty() {
            if levels.len() >= self.config.max_depth {
                return Err(IncludeError::Configuration(format!(
                    "Nested inclusions exceed the maximum depth of {}",
                    self.config.max_depth
                )));
            }

            let (ready, waiting): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|inclusion| inclusion.from().map_or(true, |p| resolved.contains(p)));

            if ready.is_empty() {
                let names: Vec<&str> = waiting.iter().map(|inclusion| inclusion.name()).collect();
                return Err(IncludeError::Configuration(format!(
                    "Circular nesting between inclusions: {}",
                    names.join(", ")
                )));
            }

            resolved.extend(ready.iter().map(|inclusion| inclusion.name()));
            levels.push(ready);
            pending = waiting;
        }

        Ok(levels)
    }

    async fn resolve(
        &self,
        inclusion: &Inclusion<M>,
        sources: Vec<&Document>,
    ) -> IncludeResult<LoadedRelation<M>> {
        let batches = if inclusion.is_polymorphic_belongs_to() {
            self.resolve_polymorphic(inclusion, &sources).await?
        } else {
            self.resolve_direct(inclusion, &sources).await?
        };

        Ok(LoadedRelation {
            metadata: inclusion.metadata().clone(),
            from: inclusion.from().map(str::to_string),
            batches,
        })
    }

    async fn resolve_direct(
        &self,
        inclusion: &Inclusion<M>,
        sources: &[&Document],
    ) -> IncludeResult<Vec<LoadedBatch>> {
        let metadata = inclusion.metadata();
        let (source_field, target_field) = if metadata.kind().owns_foreign_key() {
            (metadata.foreign_key(), metadata.primary_key())
        } else {
            (metadata.primary_key(), metadata.foreign_key())
        };

        let values = collect_keys(sources.iter().copied(), source_field);
        if values.is_empty() {
            tracing::trace!("No keys for '{}', skipping batch", inclusion.name());
            return Ok(Vec::new());
        }

        let mut documents = inclusion
            .load_documents_for(&self.store, target_field, &values)
            .await?;

        // Targets of a polymorphic has-one/has-many share the key space of
        // every owner class; keep the ones that point at this owner class.
        let owner = self.owner_class(inclusion)?;
        if let (Some(owner), Some(column)) = (owner, metadata.discriminator()) {
            let loaded = documents.len();
            documents.retain(|document| string_field(document, column) == Some(owner));
            tracing::trace!(
                "Kept {} of {} '{}' documents owned by {}",
                documents.len(),
                loaded,
                inclusion.name(),
                owner
            );
        }

        Ok(vec![LoadedBatch {
            class: metadata.target_class().map(str::to_string),
            values,
            documents,
        }])
    }

    /// Owner class a polymorphic has-one/has-many target must name in its
    /// type column: the root model for root inclusions, the parent's target
    /// class for nested ones. `None` for every other relation.
    fn owner_class<'a>(&'a self, inclusion: &'a Inclusion<M>) -> IncludeResult<Option<&'a str>> {
        let metadata = inclusion.metadata();
        if !metadata.is_polymorphic() || metadata.kind().owns_foreign_key() {
            return Ok(None);
        }

        let owner = match inclusion.from() {
            None => self.model.as_deref(),
            Some(parent) => self
                .inclusions
                .get(parent)
                .and_then(|parent| parent.metadata().target_class()),
        };

        owner.map(Some).ok_or_else(|| {
            IncludeError::Configuration(format!(
                "Polymorphic relation '{}' needs the owner class to match '{}'",
                inclusion.name(),
                metadata.discriminator().unwrap_or_default()
            ))
        })
    }

    /// Fan a polymorphic belongs-to relation out into one retargeted
    /// inclusion per concrete class found on the sources.
    async fn resolve_polymorphic(
        &self,
        inclusion: &Inclusion<M>,
        sources: &[&Document],
    ) -> IncludeResult<Vec<LoadedBatch>> {
        let metadata = inclusion.metadata();
        let discriminator = metadata.discriminator().ok_or_else(|| {
            IncludeError::Configuration(format!(
                "Polymorphic relation '{}' has no type column",
                inclusion.name()
            ))
        })?;

        let mut by_class: BTreeMap<&str, KeySet> = BTreeMap::new();
        for document in sources {
            let Some(class_name) = string_field(document, discriminator) else {
                continue;
            };
            let keys = keys_of(document, metadata.foreign_key());
            if !keys.is_empty() {
                by_class.entry(class_name).or_default().extend(keys);
            }
        }

        tracing::debug!(
            "Polymorphic relation '{}' resolves to {} classes",
            inclusion.name(),
            by_class.len()
        );

        let targets = by_class
            .into_iter()
            .map(|(class_name, values)| -> IncludeResult<_> {
                Ok((inclusion.for_class_name(class_name)?, class_name, values))
            })
            .collect::<IncludeResult<Vec<_>>>()?;

        let loads: Vec<_> = targets
            .iter()
            .map(|(retargeted, class_name, values)| async move {
                let documents = retargeted
                    .load_documents_for(&self.store, retargeted.metadata().primary_key(), values)
                    .await?;
                Ok::<_, IncludeError>(LoadedBatch {
                    class: Some(class_name.to_string()),
                    values: values.clone(),
                    documents,
                })
            })
            .collect();

        self.run(loads).await
    }

    /// Await independent loads, concurrently unless configured otherwise.
    async fn run<F, T>(&self, loads: Vec<F>) -> IncludeResult<Vec<T>>
    where
        F: Future<Output = IncludeResult<T>>,
    {
        if self.config.parallel_execution {
            return try_join_all(loads).await;
        }

        let mut results = Vec::with_capacity(loads.len());
        for load in loads {
            results.push(load.await?);
        }
        Ok(results)
    }
}
