//! Kubeconfig Merger
//!
//! Combines an ordered list of named kubeconfig documents into one document
//! whose cluster, user and context names are globally unique.

use super::naming::{candidate_name, file_prefix, unique_name};
use super::MergeError;
use crate::kubeconfig::{self, Context, KubeConfig, MergedConfig};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Raw kubeconfig bytes together with the name used to prefix its entities
#[derive(Debug, Clone)]
pub struct NamedSource {
    pub name: String,
    pub data: Vec<u8>,
}

impl NamedSource {
    /// Create a new named source
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Merge sources in order.
///
/// Order matters: it decides which colliding entity gets the numeric suffix
/// and which source's `current-context` wins. Any source that fails to parse
/// aborts the whole merge.
pub fn merge_sources(sources: &[NamedSource]) -> Result<MergedConfig, MergeError> {
    let mut merged = MergedConfig::new();

    for source in sources {
        let config = kubeconfig::parse(&source.data).map_err(|e| MergeError::Parse {
            source_name: source.name.clone(),
            source: e,
        })?;
        merge_into(&mut merged, &source.name, config);
    }

    merged.apply_format_defaults();
    Ok(merged)
}

/// Read and merge kubeconfig files, naming each by its file stem.
///
/// Read failures carry the file path as the source name.
pub fn merge_files<P: AsRef<Path>>(paths: &[P]) -> Result<MergedConfig, MergeError> {
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| MergeError::Read {
            source_name: path.display().to_string(),
            source: e,
        })?;
        sources.push(NamedSource::new(file_prefix(path), data));
    }

    merge_sources(&sources)
}

/// Merge one parsed source into `dest`
fn merge_into(dest: &mut MergedConfig, prefix: &str, config: KubeConfig) {
    let mut cluster_names: HashMap<String, String> = HashMap::new();
    let mut user_names: HashMap<String, String> = HashMap::new();

    for named in config.clusters {
        let name = insert_unique(&mut dest.clusters, prefix, &named.name, named.cluster);
        cluster_names.insert(named.name, name);
    }

    for named in config.users {
        let name = insert_unique(&mut dest.auth_infos, prefix, &named.name, named.user);
        user_names.insert(named.name, name);
    }

    for named in config.contexts {
        let cluster = resolve_reference(
            &cluster_names,
            prefix,
            &named.name,
            "cluster",
            &named.context.cluster,
        );
        let user = resolve_reference(
            &user_names,
            prefix,
            &named.name,
            "user",
            &named.context.user,
        );
        let context = Context {
            cluster,
            user,
            ..named.context
        };
        let name = insert_unique(&mut dest.contexts, prefix, &named.name, context);

        if dest.current_context.is_empty()
            && !config.current_context.is_empty()
            && config.current_context == named.name
        {
            debug!("Current context set to {} from source {}", name, prefix);
            dest.current_context = name;
        }
    }
}

/// Insert `value` under a collision-free name and return that name
fn insert_unique<T>(
    dest: &mut BTreeMap<String, T>,
    prefix: &str,
    original: &str,
    value: T,
) -> String {
    let name = unique_name(dest, &candidate_name(original, prefix));
    dest.insert(name.clone(), value);
    name
}

/// Rename a context's reference using its own source's rename table
fn resolve_reference(
    renames: &HashMap<String, String>,
    prefix: &str,
    context: &str,
    kind: &str,
    reference: &str,
) -> String {
    match renames.get(reference) {
        Some(name) => name.clone(),
        None => {
            if !reference.is_empty() {
                warn!(
                    "Context '{}' in source {} references unknown {} '{}'",
                    context, prefix, kind, reference
                );
            }
            String::new()
        }
    }
}
