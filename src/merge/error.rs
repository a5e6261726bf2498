//! Merge Errors

use thiserror::Error;

/// Why a merge attempt was abandoned. Always names the offending source.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("merge {source_name}: failed to read: {source}")]
    Read {
        source_name: String,
        source: std::io::Error,
    },

    #[error("merge {source_name}: {source}")]
    Parse {
        source_name: String,
        source: serde_yaml::Error,
    },
}

impl MergeError {
    /// Name of the source that caused the failure
    pub fn source_name(&self) -> &str {
        match self {
            MergeError::Read { source_name, .. } | MergeError::Parse { source_name, .. } => {
                source_name
            }
        }
    }
}
