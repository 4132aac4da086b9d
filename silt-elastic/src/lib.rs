//! Elasticsearch destination for silt.
//!
//! Speaks the HTTP bulk protocol directly: actions are rendered as NDJSON
//! request bodies, per-item outcomes are read back out of the bulk response,
//! and index management uses the index HEAD/PUT endpoints.

mod client;
mod core;
mod encoding;

pub use core::EsDestination;
