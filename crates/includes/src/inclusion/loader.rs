//! Custom loaders and post-fetch modifiers supplied by callers

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Documents, KeySet};
use crate::error::IncludeResult;

/// Replaces the default store query for an inclusion. The loader owns
/// correctness and batching for the relation it is attached to.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Fetch the documents whose `foreign_key` value is one of `values`
    async fn load(&self, foreign_key: &str, values: &KeySet) -> IncludeResult<Documents>;
}

/// Shared handle to a custom loader
pub type SharedLoader = Arc<dyn DocumentLoader>;

/// Post-fetch transform applied to documents returned by the store
pub type Modifier = Arc<dyn Fn(Documents) -> Documents + Send + Sync>;

/// Adapts an async closure into a [`DocumentLoader`]
pub struct FnLoader<F> {
    f: F,
}

impl<F> FnLoader<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> DocumentLoader for FnLoader<F>
where
    F: Fn(String, KeySet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = IncludeResult<Documents>> + Send + 'static,
{
    async fn load(&self, foreign_key: &str, values: &KeySet) -> IncludeResult<Documents> {
        (self.f)(foreign_key.to_string(), values.clone()).await
    }
}

/// Build a shared loader from an async closure
pub fn loader_fn<F, Fut>(f: F) -> SharedLoader
where
    F: Fn(String, KeySet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = IncludeResult<Documents>> + Send + 'static,
{
    Arc::new(FnLoader::new(f))
}

/// Build a shared modifier from a closure
pub fn modifier_fn<F>(f: F) -> Modifier
where
    F: Fn(Documents) -> Documents + Send + Sync + 'static,
{
    Arc::new(f)
}
