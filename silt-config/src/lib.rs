//! Configuration types and loading for silt replicators.

mod load;
pub mod shared;

pub use load::{LoadConfigError, load_config_from_path};
