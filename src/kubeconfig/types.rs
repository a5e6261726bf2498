//! Kubeconfig Document Types

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Default `apiVersion` written on merged documents
pub const DEFAULT_API_VERSION: &str = "v1";

/// Default `kind` written on merged documents
pub const DEFAULT_KIND: &str = "Config";

/// A kubeconfig document as it appears on disk
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferences: Mapping,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<NamedAuthInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default, deserialize_with = "null_as_default")]
    pub current_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Cluster entry with its name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: Cluster,
}

/// User (auth info) entry with its name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NamedAuthInfo {
    pub name: String,
    #[serde(default)]
    pub user: AuthInfo,
}

/// Context entry with its name
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NamedContext {
    pub name: String,
    #[serde(default)]
    pub context: Context,
}

/// Connection details for a cluster.
///
/// Fields that are not modelled explicitly are kept in `extra` so that a
/// parse/serialize cycle never drops data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(
        rename = "certificate-authority",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority: Option<String>,
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<String>,
    #[serde(
        rename = "insecure-skip-tls-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(rename = "tls-server-name", default, skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
    #[serde(rename = "proxy-url", default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Credentials for a user
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthInfo {
    #[serde(
        rename = "client-certificate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate: Option<String>,
    #[serde(
        rename = "client-certificate-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<String>,
    #[serde(rename = "client-key", default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    #[serde(rename = "client-key-data", default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "tokenFile", default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// `exec`, `auth-provider`, `as` and anything else
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A (cluster, user, namespace) triple
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Context {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cluster: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Result of merging several kubeconfig documents.
///
/// Each namespace is keyed by its final, globally unique name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedConfig {
    pub api_version: String,
    pub kind: String,
    pub clusters: BTreeMap<String, Cluster>,
    pub auth_infos: BTreeMap<String, AuthInfo>,
    pub contexts: BTreeMap<String, Context>,
    pub current_context: String,
}

impl MergedConfig {
    /// Create an empty merged config with no format markers set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in `apiVersion`/`kind` if they are still unset
    pub fn apply_format_defaults(&mut self) {
        if self.api_version.is_empty() {
            self.api_version = DEFAULT_API_VERSION.to_string();
        }
        if self.kind.is_empty() {
            self.kind = DEFAULT_KIND.to_string();
        }
    }
}

impl From<MergedConfig> for KubeConfig {
    fn from(merged: MergedConfig) -> Self {
        Self {
            api_version: merged.api_version,
            kind: merged.kind,
            preferences: Mapping::new(),
            clusters: merged
                .clusters
                .into_iter()
                .map(|(name, cluster)| NamedCluster { name, cluster })
                .collect(),
            users: merged
                .auth_infos
                .into_iter()
                .map(|(name, user)| NamedAuthInfo { name, user })
                .collect(),
            contexts: merged
                .contexts
                .into_iter()
                .map(|(name, context)| NamedContext { name, context })
                .collect(),
            current_context: merged.current_context,
            extensions: None,
        }
    }
}

impl From<KubeConfig> for MergedConfig {
    fn from(config: KubeConfig) -> Self {
        Self {
            api_version: config.api_version,
            kind: config.kind,
            clusters: config
                .clusters
                .into_iter()
                .map(|named| (named.name, named.cluster))
                .collect(),
            auth_infos: config
                .users
                .into_iter()
                .map(|named| (named.name, named.user))
                .collect(),
            contexts: config
                .contexts
                .into_iter()
                .map(|named| (named.name, named.context))
                .collect(),
            current_context: config.current_context,
        }
    }
}

/// Treat an explicit YAML `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
