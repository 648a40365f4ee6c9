//! Relationship Registry - runtime lookup of declared relations by model

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::metadata::RelationMetadata;
use crate::error::{IncludeError, IncludeResult};
use crate::inclusion::{Inclusion, InclusionOptions};

/// Thread-safe relationship registry for storing and accessing metadata at runtime
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    /// Map of model name -> relationship name -> metadata
    relationships: Arc<DashMap<String, HashMap<String, RelationMetadata>>>,
}

impl RelationshipRegistry {
    /// Create a new empty relationship registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load declarations shaped as `{ "Model": [metadata, ...] }`
    pub fn from_json(json: &str) -> IncludeResult<Self> {
        let declarations: HashMap<String, Vec<RelationMetadata>> = serde_json::from_str(json)?;
        let registry = Self::new();
        for (model, relations) in declarations {
            for metadata in relations {
                registry.register(&model, metadata)?;
            }
        }
        Ok(registry)
    }

    /// Register a relationship for a model
    pub fn register(&self, model_name: &str, metadata: RelationMetadata) -> IncludeResult<()> {
        metadata.validate()?;

        tracing::trace!("Registering relation {}.{}", model_name, metadata.name);
        self.relationships
            .entry(model_name.to_string())
            .or_insert_with(HashMap::new)
            .insert(metadata.name.clone(), metadata);

        Ok(())
    }

    /// Get relationship metadata by model and relationship name
    pub fn get(&self, model_name: &str, relationship_name: &str) -> Option<RelationMetadata> {
        self.relationships
            .get(model_name)?
            .get(relationship_name)
            .cloned()
    }

    /// Check if a relationship exists
    pub fn has_relationship(&self, model_name: &str, relationship_name: &str) -> bool {
        self.relationships
            .get(model_name)
            .map(|relationships| relationships.contains_key(relationship_name))
            .unwrap_or(false)
    }

    /// Get all relationship names for a model, sorted
    pub fn relationship_names(&self, model_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .get(model_name)
            .map(|relationships| relationships.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Get the polymorphic relationships declared on a model
    pub fn polymorphic_relationships(&self, model_name: &str) -> Vec<RelationMetadata> {
        self.relationships
            .get(model_name)
            .map(|relationships| {
                relationships
                    .values()
                    .filter(|metadata| metadata.polymorphic.is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Build an inclusion for a declared relation
    pub fn inclusion(
        &self,
        model_name: &str,
        relationship_name: &str,
        options: InclusionOptions,
    ) -> IncludeResult<Inclusion> {
        let metadata = self.get(model_name, relationship_name).ok_or_else(|| {
            IncludeError::Relationship(format!(
                "Relationship '{}' is not declared on '{}'",
                relationship_name, model_name
            ))
        })?;

        Ok(Inclusion::with_options(metadata, options))
    }

    /// Number of models with registered relationships
    pub fn model_count(&self) -> usize {
        self.relationships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships::metadata::{PolymorphicConfig, RelationshipType};

    fn registry() -> RelationshipRegistry {
        let registry = RelationshipRegistry::new();
        registry
            .register(
                "Person",
                RelationMetadata::new(RelationshipType::HasMany, "pets", "Pet", "owner_id"),
            )
            .unwrap();
        registry
            .register(
                "Toy",
                RelationMetadata::polymorphic_belongs_to(
                    "ownable",
                    "ownable_id",
                    PolymorphicConfig::new("ownable", "ownable_type"),
                ),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_get() {
        let registry = registry();

        assert!(registry.has_relationship("Person", "pets"));
        assert!(!registry.has_relationship("Person", "toys"));
        assert!(!registry.has_relationship("Robot", "pets"));
        assert_eq!(registry.get("Person", "pets").unwrap().foreign_key, "owner_id");
        assert_eq!(registry.relationship_names("Person"), vec!["pets".to_string()]);
        assert_eq!(registry.model_count(), 2);
    }

    #[test]
    fn test_register_rejects_invalid_metadata() {
        let registry = RelationshipRegistry::new();
        let invalid = RelationMetadata::new(RelationshipType::HasOne, "", "Profile", "user_id");
        assert!(registry.register("User", invalid).is_err());
        assert_eq!(registry.model_count(), 0);
    }

    #[test]
    fn test_polymorphic_relationships() {
        let registry = registry();
        assert_eq!(registry.polymorphic_relationships("Toy").len(), 1);
        assert!(registry.polymorphic_relationships("Person").is_empty());
    }

    #[test]
    fn test_inclusion_lookup() {
        let registry = registry();

        let inclusion = registry
            .inclusion("Person", "pets", InclusionOptions::new())
            .unwrap();
        assert_eq!(inclusion.name(), "pets");
        assert!(!inclusion.is_nested());

        let missing = registry.inclusion("Person", "cars", InclusionOptions::new());
        assert!(matches!(missing, Err(IncludeError::Relationship(_))));
    }

    #[test]
    fn test_from_json() {
        let registry = RelationshipRegistry::from_json(
            r#"{
                "Person": [
                    {
                        "name": "pets",
                        "kind": "has_many",
                        "related_model": "Pet",
                        "foreign_key": "owner_id"
                    }
                ],
                "Pet": [
                    {
                        "name": "owner",
                        "kind": "belongs_to",
                        "related_model": "Person",
                        "foreign_key": "owner_id"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert!(registry.has_relationship("Pet", "owner"));
        assert_eq!(
            registry.get("Pet", "owner").unwrap().relationship_type,
            RelationshipType::BelongsTo
        );

        let broken = RelationshipRegistry::from_json(r#"{ "Person": [ { "name": "pets" } ] }"#);
        assert!(matches!(broken, Err(IncludeError::Serialization(_))));
    }
}
