/// Eager loading of inclusions against a document store
/// Plans nesting levels, batches lookups and stitches results back

mod eager_loader;
mod hydration;
mod result;

pub use eager_loader::EagerLoader;
pub use result::{EagerLoadResult, EagerLoadStats, LoadedBatch, LoadedRelation};
