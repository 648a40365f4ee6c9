//! Inclusion - one relation to preload together with its loading policy
//!
//! An inclusion wraps the relation descriptor it was declared with plus the
//! options the caller attached to it:
//! - `from`: the relation through which a nested inclusion is reached
//! - `loader`: replaces the default store query entirely
//! - `with`: transforms documents returned by the default store query
//!
//! Options are resolved when the inclusion is built and never change
//! afterwards, so an inclusion can be shared across tasks freely.

mod collection;
mod loader;

use std::fmt;

use serde_json::Value as JsonValue;

use crate::document::{Documents, KeySet};
use crate::error::{IncludeError, IncludeResult};
use crate::relationships::{Relation, RelationMetadata, RelationshipType};
use crate::store::DocumentStore;

pub use collection::Inclusions;
pub use loader::{loader_fn, modifier_fn, DocumentLoader, FnLoader, Modifier, SharedLoader};

/// Options recognized when declaring an inclusion
#[derive(Clone, Default)]
pub struct InclusionOptions {
    from: Option<String>,
    loader: Option<SharedLoader>,
    with: Option<Modifier>,
}

impl InclusionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from a configuration bag. Only `from` can be expressed
    /// this way; unknown keys are ignored.
    pub fn from_json(options: &JsonValue) -> IncludeResult<Self> {
        let bag = match options {
            JsonValue::Null => return Ok(Self::new()),
            JsonValue::Object(bag) => bag,
            other => {
                return Err(IncludeError::Configuration(format!(
                    "Inclusion options must be an object, got {}",
                    other
                )))
            }
        };

        let mut options = Self::new();
        match bag.get("from") {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::String(from)) => options = options.from_relation(from.as_str()),
            Some(other) => {
                return Err(IncludeError::Configuration(format!(
                    "Inclusion option 'from' must name a relation, got {}",
                    other
                )))
            }
        }

        for key in ["loader", "with"] {
            if bag.contains_key(key) {
                return Err(IncludeError::Configuration(format!(
                    "Inclusion option '{}' must be supplied as a function, not configuration",
                    key
                )));
            }
        }

        Ok(options)
    }

    /// Resolve this inclusion through the named parent relation
    pub fn from_relation(mut self, relation: impl Into<String>) -> Self {
        self.from = Some(relation.into());
        self
    }

    /// Replace the default store query with a custom loader
    pub fn loader(mut self, loader: SharedLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Transform documents returned by the default store query
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.with = Some(modifier);
        self
    }
}

impl fmt::Debug for InclusionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InclusionOptions")
            .field("from", &self.from)
            .field("loader", &self.loader.is_some())
            .field("with", &self.with.is_some())
            .finish()
    }
}

/// A relation that needs to be eager loaded
#[derive(Clone)]
pub struct Inclusion<M: Relation = RelationMetadata> {
    metadata: M,
    from: Option<String>,
    loader: Option<SharedLoader>,
    modifier: Option<Modifier>,
}

impl<M: Relation> Inclusion<M> {
    /// Create an inclusion without options
    pub fn new(metadata: M) -> Self {
        Self::with_options(metadata, InclusionOptions::new())
    }

    /// Create an inclusion with caller-supplied options
    pub fn with_options(metadata: M, options: InclusionOptions) -> Self {
        Self {
            metadata,
            from: options.from.filter(|from| !from.is_empty()),
            loader: options.loader,
            modifier: options.with,
        }
    }

    /// The wrapped relation descriptor
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Name of the included relation
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Name of the relation from which a nested inclusion is performed
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Returns true if the relation is reached through another relation
    pub fn is_nested(&self) -> bool {
        self.from.is_some()
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn has_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    /// Returns true only for polymorphic belongs-to relations, where each
    /// owning document may point at a different class.
    pub fn is_polymorphic_belongs_to(&self) -> bool {
        self.metadata.is_polymorphic() && self.metadata.kind() == RelationshipType::BelongsTo
    }

    /// Compare against a bare relation descriptor, ignoring nesting
    pub fn matches_relation(&self, metadata: &M) -> bool {
        self.metadata == *metadata
    }

    /// Copy this inclusion onto a concrete class. The copy wraps its own,
    /// non-polymorphic metadata and keeps the loader, modifier and nesting.
    ///
    /// The nesting path is kept on purpose: a polymorphic relation reached
    /// through a parent relation is still resolved against that parent's
    /// documents after fan-out.
    pub fn for_class_name(&self, class_name: &str) -> IncludeResult<Self> {
        let metadata = self.metadata.retarget(class_name)?;
        tracing::trace!("Retargeted relation '{}' to '{}'", self.name(), class_name);

        Ok(Self {
            metadata,
            from: self.from.clone(),
            loader: self.loader.clone(),
            modifier: self.modifier.clone(),
        })
    }

    /// Preload the documents for the relation in a single call. Uses the
    /// custom loader if one was provided, otherwise queries the store for
    /// the target class and applies the modifier.
    pub async fn load_documents_for<S>(
        &self,
        store: &S,
        foreign_key: &str,
        values: &KeySet,
    ) -> IncludeResult<Documents>
    where
        S: DocumentStore + ?Sized,
    {
        if let Some(loader) = &self.loader {
            tracing::debug!(
                "Loading '{}' through custom loader ({} = {} values)",
                self.name(),
                foreign_key,
                values.len()
            );
            return loader.load(foreign_key, values).await;
        }

        let target = self.metadata.target_class().ok_or_else(|| {
            IncludeError::Configuration(format!(
                "Relation '{}' is polymorphic and must be retargeted to a class before loading",
                self.name()
            ))
        })?;

        tracing::debug!(
            "Loading '{}' from {} where {} in {} values",
            self.name(),
            target,
            foreign_key,
            values.len()
        );
        let documents = store.find_where(target, foreign_key, values).await?;

        Ok(match &self.modifier {
            Some(modifier) => modifier(documents),
            None => documents,
        })
    }
}

impl<M: Relation> PartialEq for Inclusion<M> {
    /// Same relation reached through the same path
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.from == other.from
    }
}

impl<M: Relation> fmt::Debug for Inclusion<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inclusion")
            .field("metadata", &self.metadata)
            .field("from", &self.from)
            .field("loader", &self.loader.is_some())
            .field("modifier", &self.modifier.is_some())
            .finish()
    }
}
