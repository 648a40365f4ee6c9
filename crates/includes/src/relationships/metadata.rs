//! Relationship Metadata - the relation descriptors inclusions are built from

use std::fmt::Debug;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IncludeError, IncludeResult};

/// Defines the kind of relationship between models.
///
/// Legacy relation macro names are accepted when parsing, so adapters for
/// older schema layers map onto the same three kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Many-to-one, the foreign key lives on the owning document (belongsTo)
    #[serde(alias = "referenced_in")]
    BelongsTo,
    /// One-to-one, the foreign key lives on the target (hasOne)
    #[serde(alias = "references_one")]
    HasOne,
    /// One-to-many, the foreign key lives on the targets (hasMany)
    #[serde(alias = "references_many")]
    HasMany,
}

impl RelationshipType {
    /// Returns true if this relationship resolves to a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Returns true if the owning document stores the foreign key
    pub fn owns_foreign_key(self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl FromStr for RelationshipType {
    type Err = IncludeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "belongs_to" | "referenced_in" => Ok(Self::BelongsTo),
            "has_one" | "references_one" => Ok(Self::HasOne),
            "has_many" | "references_many" => Ok(Self::HasMany),
            other => Err(IncludeError::Configuration(format!(
                "Unknown relationship type '{}'",
                other
            ))),
        }
    }
}

/// Polymorphic relationship configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicConfig {
    /// The name/namespace for this polymorphic relationship
    pub name: String,

    /// The morph type column name (stores the concrete class)
    pub type_column: String,

    /// Allowed types for this polymorphic relationship, empty means any
    #[serde(default)]
    pub allowed_types: Vec<String>,
}

impl PolymorphicConfig {
    /// Create a new polymorphic configuration
    pub fn new(name: impl Into<String>, type_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_column: type_column.into(),
            allowed_types: Vec::new(),
        }
    }

    /// Set allowed types for the polymorphic relationship
    pub fn with_allowed_types(mut self, types: Vec<String>) -> Self {
        self.allowed_types = types;
        self
    }

    /// Returns true if documents may point at `class_name`
    pub fn allows(&self, class_name: &str) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.iter().any(|t| t == class_name)
    }

    /// Validate the polymorphic configuration
    pub fn validate(&self) -> IncludeResult<()> {
        if self.name.is_empty() {
            return Err(IncludeError::Configuration(
                "Polymorphic relationship name cannot be empty".to_string(),
            ));
        }

        if self.type_column.is_empty() {
            return Err(IncludeError::Configuration(
                "Polymorphic type column cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Relation descriptor as declared on a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMetadata {
    /// Name of the relationship (field name in the model)
    pub name: String,

    /// The kind of relationship
    #[serde(rename = "kind")]
    pub relationship_type: RelationshipType,

    /// The related model's class name, absent while polymorphic
    #[serde(default)]
    pub related_model: Option<String>,

    /// Foreign key field
    pub foreign_key: String,

    /// Primary key field on the side the foreign key points at
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Polymorphic configuration
    #[serde(default)]
    pub polymorphic: Option<PolymorphicConfig>,

    /// Inverse relationship name
    #[serde(default)]
    pub inverse: Option<String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl RelationMetadata {
    /// Create a new relation targeting a concrete model
    pub fn new(
        relationship_type: RelationshipType,
        name: impl Into<String>,
        related_model: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relationship_type,
            related_model: Some(related_model.into()),
            foreign_key: foreign_key.into(),
            primary_key: default_primary_key(),
            polymorphic: None,
            inverse: None,
        }
    }

    /// Create a polymorphic belongs-to relation; the target class is read
    /// per document from the morph type column.
    pub fn polymorphic_belongs_to(
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        polymorphic: PolymorphicConfig,
    ) -> Self {
        Self {
            name: name.into(),
            relationship_type: RelationshipType::BelongsTo,
            related_model: None,
            foreign_key: foreign_key.into(),
            primary_key: default_primary_key(),
            polymorphic: Some(polymorphic),
            inverse: None,
        }
    }

    /// Set the primary key field
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Set the related model
    pub fn with_related_model(mut self, related_model: impl Into<String>) -> Self {
        self.related_model = Some(related_model.into());
        self
    }

    /// Set polymorphic configuration
    pub fn with_polymorphic(mut self, polymorphic: PolymorphicConfig) -> Self {
        self.polymorphic = Some(polymorphic);
        self
    }

    /// Drop polymorphic configuration
    pub fn without_polymorphic(mut self) -> Self {
        self.polymorphic = None;
        self
    }

    /// Set the inverse relationship name
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> IncludeResult<()> {
        if self.name.is_empty() {
            return Err(IncludeError::Configuration(
                "Relationship name cannot be empty".to_string(),
            ));
        }

        if self.foreign_key.is_empty() || self.primary_key.is_empty() {
            return Err(IncludeError::Configuration(format!(
                "Relationship '{}' must declare both a foreign key and a primary key",
                self.name
            )));
        }

        match &self.polymorphic {
            Some(poly) => poly.validate()?,
            None if self.related_model.as_deref().map_or(true, str::is_empty) => {
                return Err(IncludeError::Configuration(format!(
                    "Relationship '{}' of type {:?} requires a related model",
                    self.name, self.relationship_type
                )));
            }
            None => {}
        }

        Ok(())
    }
}

/// The parts of a relation descriptor the resolver relies on.
pub trait Relation: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Relation name
    fn name(&self) -> &str;

    /// Concrete target class, `None` while the relation is polymorphic
    fn target_class(&self) -> Option<&str>;

    /// Foreign key field
    fn foreign_key(&self) -> &str;

    /// Primary key field the foreign key refers to
    fn primary_key(&self) -> &str;

    fn is_polymorphic(&self) -> bool;

    fn kind(&self) -> RelationshipType;

    /// Field holding the concrete class of a polymorphic target
    fn discriminator(&self) -> Option<&str>;

    /// Return an independent copy fixed to `class_name` with polymorphism
    /// cleared. `self` is left untouched.
    fn retarget(&self, class_name: &str) -> IncludeResult<Self>;
}

impl Relation for RelationMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_class(&self) -> Option<&str> {
        self.related_model.as_deref()
    }

    fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn is_polymorphic(&self) -> bool {
        self.polymorphic.is_some()
    }

    fn kind(&self) -> RelationshipType {
        self.relationship_type
    }

    fn discriminator(&self) -> Option<&str> {
        self.polymorphic.as_ref().map(|poly| poly.type_column.as_str())
    }

    fn retarget(&self, class_name: &str) -> IncludeResult<Self> {
        let refuse = |reason: &str| IncludeError::Retarget {
            relation: self.name.clone(),
            class_name: class_name.to_string(),
            reason: reason.to_string(),
        };

        if class_name.trim().is_empty() {
            return Err(refuse("class name is blank"));
        }

        if let Some(poly) = &self.polymorphic {
            if !poly.allows(class_name) {
                return Err(refuse("class is not an allowed polymorphic type"));
            }
        }

        let retargeted = self
            .clone()
            .with_related_model(class_name)
            .without_polymorphic();
        retargeted.validate().map_err(|e| refuse(&e.to_string()))?;
        Ok(retargeted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet() -> RelationMetadata {
        RelationMetadata::polymorphic_belongs_to(
            "pet",
            "ownable_id",
            PolymorphicConfig::new("ownable", "ownable_type"),
        )
    }

    #[test]
    fn test_relationship_type_properties() {
        assert!(RelationshipType::HasMany.is_collection());
        assert!(!RelationshipType::HasOne.is_collection());
        assert!(RelationshipType::BelongsTo.owns_foreign_key());
        assert!(!RelationshipType::HasMany.owns_foreign_key());
    }

    #[test]
    fn test_relationship_type_accepts_legacy_names() {
        assert_eq!(
            "referenced_in".parse::<RelationshipType>().unwrap(),
            RelationshipType::BelongsTo
        );
        assert_eq!("belongs_to".parse::<RelationshipType>().unwrap(), RelationshipType::BelongsTo);
        assert_eq!(
            "references_many".parse::<RelationshipType>().unwrap(),
            RelationshipType::HasMany
        );
        assert!("embeds_many".parse::<RelationshipType>().is_err());

        let kind: RelationshipType = serde_json::from_str("\"references_one\"").unwrap();
        assert_eq!(kind, RelationshipType::HasOne);
    }

    #[test]
    fn test_relation_metadata_validation() {
        let posts = RelationMetadata::new(RelationshipType::HasMany, "posts", "Post", "user_id");
        assert!(posts.validate().is_ok());
        assert_eq!(posts.primary_key, "id");

        let mut missing_model = posts.clone();
        missing_model.related_model = None;
        assert!(missing_model.validate().is_err());

        assert!(pet().validate().is_ok());

        let bad_poly = pet().with_polymorphic(PolymorphicConfig::new("ownable", ""));
        assert!(bad_poly.validate().is_err());
    }

    #[test]
    fn test_relation_accessors() {
        let relation = pet();
        assert_eq!(Relation::name(&relation), "pet");
        assert_eq!(relation.target_class(), None);
        assert!(relation.is_polymorphic());
        assert_eq!(relation.discriminator(), Some("ownable_type"));
        assert_eq!(relation.kind(), RelationshipType::BelongsTo);
    }

    #[test]
    fn test_retarget_leaves_source_untouched() {
        let source = pet();
        let dog = source.retarget("Dog").unwrap();

        assert_eq!(dog.target_class(), Some("Dog"));
        assert!(!dog.is_polymorphic());
        assert_eq!(dog.discriminator(), None);
        assert_eq!(dog.foreign_key, "ownable_id");

        assert_eq!(source.target_class(), None);
        assert!(source.is_polymorphic());
        assert_eq!(source, pet());
    }

    #[test]
    fn test_retarget_refuses_unknown_types() {
        let source = pet().with_polymorphic(
            PolymorphicConfig::new("ownable", "ownable_type")
                .with_allowed_types(vec!["Dog".to_string(), "Cat".to_string()]),
        );

        assert!(source.retarget("Cat").is_ok());
        assert!(matches!(
            source.retarget("Fish"),
            Err(IncludeError::Retarget { .. })
        ));
        assert!(matches!(source.retarget("  "), Err(IncludeError::Retarget { .. })));
    }

    #[test]
    fn test_metadata_deserializes_from_declaration() {
        let metadata: RelationMetadata = serde_json::from_value(serde_json::json!({
            "name": "pet",
            "kind": "referenced_in",
            "foreign_key": "ownable_id",
            "polymorphic": { "name": "ownable", "type_column": "ownable_type" }
        }))
        .unwrap();

        assert_eq!(metadata, pet());
    }
}
