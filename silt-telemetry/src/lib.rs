//! Tracing initialization for silt binaries and tests.

pub mod tracing;
