//! # elif-includes: Eager Loading of Document Relations
//!
//! Batched preloading of related documents: each included relation is
//! resolved with one "find where key in set" call per nesting level, and
//! polymorphic belongs-to relations fan out into one call per concrete
//! class found on the owning documents.
//!
//! ```
//! use elif_includes::{EagerLoader, Inclusion, MemoryStore, RelationMetadata, RelationshipType};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store.insert("Person", json!({"id": 7, "name": "Ada"}));
//!
//! let owner = RelationMetadata::new(RelationshipType::BelongsTo, "owner", "Person", "owner_id");
//! let loader = EagerLoader::new(&store).include(Inclusion::new(owner));
//!
//! let mut pets = vec![json!({"id": 1, "owner_id": 7}), json!({"id": 2, "owner_id": 7})];
//! let result = tokio_test::block_on(loader.load(&pets)).unwrap();
//! assert_eq!(result.query_count(), 1);
//!
//! result.attach(&mut pets);
//! assert_eq!(pets[1]["owner"]["name"], "Ada");
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod inclusion;
pub mod loading;
pub mod relationships;
pub mod store;

// Re-export core types
pub use config::EagerLoadConfig;
pub use document::{Document, Documents, KeySet, KeyValue};
pub use error::{IncludeError, IncludeResult};
pub use inclusion::{
    loader_fn, modifier_fn, DocumentLoader, FnLoader, Inclusion, InclusionOptions, Inclusions,
    Modifier, SharedLoader,
};
pub use loading::{EagerLoadResult, EagerLoadStats, EagerLoader, LoadedBatch, LoadedRelation};
pub use relationships::{
    PolymorphicConfig, Relation, RelationMetadata, RelationshipRegistry, RelationshipType,
};
pub use store::{DocumentStore, MemoryStore, RecordedQuery};
