//! Source schema access: the catalog abstraction and the per-table cache.

mod cache;
mod catalog;

pub use cache::{SchemaCache, SchemaLookup};
pub use catalog::Catalog;
