//! Merge Module
//!
//! Deterministic merging of named kubeconfig documents.

pub mod error;
pub mod merger;
pub mod naming;

pub use error::MergeError;
pub use merger::{merge_files, merge_sources, NamedSource};
pub use naming::{candidate_name, file_prefix, unique_name};
