//! Document store seam
//!
//! The persistence layer answers exactly one kind of question for eager
//! loading: every document of a class whose field value is in a key set.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Documents, KeySet};
use crate::error::IncludeResult;

pub use memory::{MemoryStore, RecordedQuery};

/// Executes batched "find by field in set" lookups
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the documents of `target_class` whose `field` value is one
    /// of `values`, in no particular order.
    async fn find_where(
        &self,
        target_class: &str,
        field: &str,
        values: &KeySet,
    ) -> IncludeResult<Documents>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn find_where(
        &self,
        target_class: &str,
        field: &str,
        values: &KeySet,
    ) -> IncludeResult<Documents> {
        (**self).find_where(target_class, field, values).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    async fn find_where(
        &self,
        target_class: &str,
        field: &str,
        values: &KeySet,
    ) -> IncludeResult<Documents> {
        (**self).find_where(target_class, field, values).await
    }
}
