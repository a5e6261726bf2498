//! Entity Naming Rules
//!
//! How entity names from one source are turned into names that are unique
//! across the merged document.

use std::collections::BTreeMap;
use std::path::Path;

/// Entity name that is replaced by the bare source name
pub const DEFAULT_ENTITY_NAME: &str = "default";

/// Candidate name for an entity called `original` in source `source`.
///
/// `default` becomes the source name itself; anything else is prefixed
/// with `<source>-`.
pub fn candidate_name(original: &str, source: &str) -> String {
    if original == DEFAULT_ENTITY_NAME {
        source.to_string()
    } else {
        format!("{}-{}", source, original)
    }
}

/// First of `base`, `base-2`, `base-3`, ... that is not a key of `taken`
pub fn unique_name<T>(taken: &BTreeMap<String, T>, base: &str) -> String {
    if !taken.contains_key(base) {
        return base.to_string();
    }

    let mut suffix = 2u64;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Source name for a kubeconfig file: its file name without the last extension
pub fn file_prefix(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
