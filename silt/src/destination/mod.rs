//! Sink abstraction and implementations.

mod base;
pub mod memory;

pub use base::{BulkItemFailure, BulkResponse, Destination};
