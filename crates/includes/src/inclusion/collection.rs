//! Ordered set of inclusions requested for one preload pass

use super::Inclusion;
use crate::relationships::{Relation, RelationMetadata};

/// Inclusions requested for a query, deduplicated by relation and nesting
/// path so each pair is batched at most once.
#[derive(Debug, Clone)]
pub struct Inclusions<M: Relation = RelationMetadata> {
    items: Vec<Inclusion<M>>,
}

impl<M: Relation> Default for Inclusions<M> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<M: Relation> Inclusions<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an inclusion unless an equal one is already present. Returns
    /// true if it was added.
    pub fn push(&mut self, inclusion: Inclusion<M>) -> bool {
        if self.contains(&inclusion) {
            tracing::trace!(
                "Skipping duplicate inclusion '{}' (from {:?})",
                inclusion.name(),
                inclusion.from()
            );
            return false;
        }
        self.items.push(inclusion);
        true
    }

    pub fn contains(&self, inclusion: &Inclusion<M>) -> bool {
        self.items.iter().any(|existing| existing == inclusion)
    }

    /// First inclusion of the named relation
    pub fn get(&self, name: &str) -> Option<&Inclusion<M>> {
        self.items.iter().find(|inclusion| inclusion.name() == name)
    }

    /// Inclusions resolved against the root documents
    pub fn roots(&self) -> impl Iterator<Item = &Inclusion<M>> {
        self.items.iter().filter(|inclusion| !inclusion.is_nested())
    }

    /// Inclusions reached through the named relation
    pub fn nested_under<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Inclusion<M>> {
        self.items
            .iter()
            .filter(move |inclusion| inclusion.from() == Some(parent))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Inclusion<M>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<M: Relation> Extend<Inclusion<M>> for Inclusions<M> {
    fn extend<T: IntoIterator<Item = Inclusion<M>>>(&mut self, iter: T) {
        for inclusion in iter {
            self.push(inclusion);
        }
    }
}

impl<M: Relation> FromIterator<Inclusion<M>> for Inclusions<M> {
    fn from_iter<T: IntoIterator<Item = Inclusion<M>>>(iter: T) -> Self {
        let mut inclusions = Self::new();
        inclusions.extend(iter);
        inclusions
    }
}

impl<'a, M: Relation> IntoIterator for &'a Inclusions<M> {
    type Item = &'a Inclusion<M>;
    type IntoIter = std::slice::Iter<'a, Inclusion<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
