//! Stitching loaded documents back onto the documents that own them

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::result::{EagerLoadResult, EagerLoadStats, LoadedRelation};
use crate::document::{keys_of, string_field, Document, KeyValue};
use crate::relationships::{Relation, RelationshipType};

impl<M: Relation> EagerLoadResult<M> {
    /// Attach every loaded relation under its name: nested relations onto
    /// the documents of their parent relation, root relations onto `roots`.
    ///
    /// Belongs-to and has-one relations become a single document or `null`,
    /// has-many relations (and array-valued foreign keys) become arrays.
    /// Targets are matched by key value, never by position.
    pub fn attach(mut self, roots: &mut [Document]) -> EagerLoadStats {
        // Children were resolved after their parents, so popping from the
        // back fills nested relations in before the parents are copied out.
        while let Some(relation) = self.relations.pop() {
            let index = RelationIndex::build(&relation);

            match relation.from.as_deref() {
                None => roots.iter_mut().for_each(|owner| index.attach_to(owner)),
                Some(parent) => self
                    .relations
                    .iter_mut()
                    .filter(|loaded| loaded.name() == parent)
                    .flat_map(|loaded| loaded.batches.iter_mut())
                    .flat_map(|batch| batch.documents.iter_mut())
                    .for_each(|owner| index.attach_to(owner)),
            }
        }

        self.stats
    }
}

/// Loaded targets of one relation, keyed by concrete class and key value
struct RelationIndex<'a> {
    name: &'a str,
    kind: RelationshipType,
    owner_field: &'a str,
    discriminator: Option<&'a str>,
    targets: HashMap<(Option<String>, KeyValue), Vec<&'a Document>>,
}

impl<'a> RelationIndex<'a> {
    fn build<M: Relation>(relation: &'a LoadedRelation<M>) -> Self {
        let metadata = &relation.metadata;
        let kind = metadata.kind();
        let (owner_field, target_field) = if kind.owns_foreign_key() {
            (metadata.foreign_key(), metadata.primary_key())
        } else {
            (metadata.primary_key(), metadata.foreign_key())
        };
        // Only belongs-to owners carry the target class; polymorphic
        // has-one/has-many targets were narrowed to the owner class on load.
        let discriminator = if kind.owns_foreign_key() {
            metadata.discriminator()
        } else {
            None
        };

        let mut targets: HashMap<(Option<String>, KeyValue), Vec<&'a Document>> = HashMap::new();
        for batch in &relation.batches {
            let class = discriminator.and(batch.class.clone());
            for document in &batch.documents {
                for key in keys_of(document, target_field) {
                    targets
                        .entry((class.clone(), key))
                        .or_default()
                        .push(document);
                }
            }
        }

        Self {
            name: metadata.name(),
            kind,
            owner_field,
            discriminator,
            targets,
        }
    }

    fn attach_to(&self, owner: &mut Document) {
        let class = self
            .discriminator
            .and_then(|column| string_field(owner, column))
            .map(str::to_string);
        if self.discriminator.is_some() && class.is_none() {
            return self.insert(owner, JsonValue::Null);
        }

        let many = self.kind.is_collection()
            || matches!(owner.get(self.owner_field), Some(JsonValue::Array(_)));

        let mut matches: Vec<&Document> = Vec::new();
        for key in keys_of(owner, self.owner_field) {
            let Some(found) = self.targets.get(&(class.clone(), key)) else {
                continue;
            };
            for document in found {
                if !matches.iter().any(|seen| std::ptr::eq(*seen, *document)) {
                    matches.push(*document);
                }
            }
        }

        let value = if many {
            JsonValue::Array(matches.into_iter().cloned().collect())
        } else {
            matches.first().map_or(JsonValue::Null, |document| (*document).clone())
        };
        self.insert(owner, value);
    }

    fn insert(&self, owner: &mut Document, value: JsonValue) {
        match owner.as_object_mut() {
            Some(object) => {
                object.insert(self.name.to_string(), value);
            }
            None => tracing::warn!("Cannot attach '{}' to a non-object document", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::KeySet;
    use crate::loading::result::LoadedBatch;
    use crate::relationships::{PolymorphicConfig, RelationMetadata};
    use serde_json::json;

    fn batch(class: &str, documents: Vec<Document>) -> LoadedBatch {
        LoadedBatch {
            class: Some(class.to_string()),
            values: KeySet::new(),
            documents,
        }
    }

    fn result_with(relations: Vec<LoadedRelation>) -> EagerLoadResult {
        let mut result = EagerLoadResult::default();
        for relation in relations {
            result.record(relation);
        }
        result
    }

    #[test]
    fn test_attach_belongs_to_and_has_many() {
        let owner = LoadedRelation {
            metadata: RelationMetadata::new(
                RelationshipType::BelongsTo,
                "owner",
                "Person",
                "owner_id",
            ),
            from: None,
            batches: vec![batch("Person", vec![json!({"id": 10, "name": "Ada"})])],
        };
        let toys = LoadedRelation {
            metadata: RelationMetadata::new(RelationshipType::HasMany, "toys", "Toy", "pet_id"),
            from: None,
            batches: vec![batch(
                "Toy",
                vec![
                    json!({"id": 100, "pet_id": 1}),
                    json!({"id": 101, "pet_id": 1}),
                ],
            )],
        };

        let mut roots = vec![
            json!({"id": 1, "owner_id": 10}),
            json!({"id": 2, "owner_id": 11}),
        ];
        let stats = result_with(vec![owner, toys]).attach(&mut roots);

        assert_eq!(stats.records_loaded, 3);
        assert_eq!(roots[0]["owner"]["name"], "Ada");
        assert_eq!(roots[0]["toys"].as_array().unwrap().len(), 2);
        assert_eq!(roots[1]["owner"], JsonValue::Null);
        assert_eq!(roots[1]["toys"], json!([]));
    }

    #[test]
    fn test_attach_polymorphic_matches_class() {
        let pet = LoadedRelation {
            metadata: RelationMetadata::polymorphic_belongs_to(
                "pet",
                "ownable_id",
                PolymorphicConfig::new("ownable", "ownable_type"),
            ),
            from: None,
            batches: vec![
                batch("Cat", vec![json!({"id": 1, "name": "Tom"})]),
                batch("Dog", vec![json!({"id": 1, "name": "Rex"})]),
            ],
        };

        let mut roots = vec![
            json!({"ownable_type": "Dog", "ownable_id": 1}),
            json!({"ownable_type": "Cat", "ownable_id": 1}),
            json!({"ownable_id": 1}),
        ];
        result_with(vec![pet]).attach(&mut roots);

        assert_eq!(roots[0]["pet"]["name"], "Rex");
        assert_eq!(roots[1]["pet"]["name"], "Tom");
        assert_eq!(roots[2]["pet"], JsonValue::Null);
    }

    #[test]
    fn test_attach_polymorphic_has_many_ignores_owner_type_column() {
        let toys = LoadedRelation {
            metadata: RelationMetadata::new(RelationshipType::HasMany, "toys", "Toy", "ownable_id")
                .with_polymorphic(PolymorphicConfig::new("ownable", "ownable_type")),
            from: None,
            batches: vec![batch(
                "Toy",
                vec![
                    json!({"id": 100, "ownable_type": "Person", "ownable_id": 1}),
                    json!({"id": 101, "ownable_type": "Person", "ownable_id": 1}),
                ],
            )],
        };
        let badge = LoadedRelation {
            metadata: RelationMetadata::new(
                RelationshipType::HasOne,
                "badge",
                "Badge",
                "ownable_id",
            )
            .with_polymorphic(PolymorphicConfig::new("ownable", "ownable_type")),
            from: None,
            batches: vec![batch(
                "Badge",
                vec![json!({"id": 7, "ownable_type": "Person", "ownable_id": 2})],
            )],
        };

        let mut roots = vec![json!({"id": 1}), json!({"id": 2})];
        result_with(vec![toys, badge]).attach(&mut roots);

        assert_eq!(roots[0]["toys"].as_array().unwrap().len(), 2);
        assert_eq!(roots[0]["badge"], JsonValue::Null);
        assert_eq!(roots[1]["toys"], json!([]));
        assert_eq!(roots[1]["badge"]["id"], 7);
    }

    #[test]
    fn test_attach_nested_before_parent() {
        let pets = LoadedRelation {
            metadata: RelationMetadata::new(RelationshipType::HasMany, "pets", "Pet", "owner_id"),
            from: None,
            batches: vec![batch("Pet", vec![json!({"id": 5, "owner_id": 1})])],
        };
        let toys = LoadedRelation {
            metadata: RelationMetadata::new(RelationshipType::HasOne, "toy", "Toy", "pet_id"),
            from: Some("pets".to_string()),
            batches: vec![batch("Toy", vec![json!({"id": 9, "pet_id": 5})])],
        };

        let mut roots = vec![json!({"id": 1})];
        result_with(vec![pets, toys]).attach(&mut roots);

        assert_eq!(roots[0]["pets"][0]["toy"]["id"], 9);
    }
}
