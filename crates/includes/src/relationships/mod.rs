//! Relationships Module - relation descriptors and their registry

pub mod metadata;
pub mod registry;

pub use metadata::*;
pub use registry::*;
