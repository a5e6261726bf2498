//! Kubeconfig Module
//!
//! The on-disk kubeconfig document model and its YAML codec.

pub mod codec;
pub mod types;

pub use codec::{parse, serialize, serialize_merged};
pub use types::*;
