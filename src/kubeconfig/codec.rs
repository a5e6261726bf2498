//! Kubeconfig Parsing and Serialization

use super::{KubeConfig, MergedConfig};
use serde::de::Error as _;
use std::collections::HashSet;

/// Parse a kubeconfig document.
///
/// An empty (or whitespace-only) document is a valid, empty config. A
/// document listing the same cluster, user or context name twice is
/// rejected, as kubectl does.
pub fn parse(bytes: &[u8]) -> Result<KubeConfig, serde_yaml::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(KubeConfig::default());
    }

    let document: Option<KubeConfig> = serde_yaml::from_slice(bytes)?;
    let config = document.unwrap_or_default();

    check_unique("clusters", config.clusters.iter().map(|c| c.name.as_str()))?;
    check_unique("users", config.users.iter().map(|u| u.name.as_str()))?;
    check_unique("contexts", config.contexts.iter().map(|c| c.name.as_str()))?;

    Ok(config)
}

fn check_unique<'a>(
    list: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), serde_yaml::Error> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(serde_yaml::Error::custom(format!(
                "{}: duplicate name \"{}\"",
                list, name
            )));
        }
    }
    Ok(())
}

/// Serialize a kubeconfig document to YAML
pub fn serialize(config: &KubeConfig) -> Result<Vec<u8>, serde_yaml::Error> {
    serde_yaml::to_string(config).map(String::into_bytes)
}

/// Serialize a merged config; entities come out sorted by name
pub fn serialize_merged(merged: &MergedConfig) -> Result<Vec<u8>, serde_yaml::Error> {
    serialize(&KubeConfig::from(merged.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: v1
kind: Config
preferences: {}
clusters:
- name: prod
  cluster:
    server: https://prod.example.com:6443
    certificate-authority-data: Q0EK
    insecure-skip-tls-verify: false
users:
- name: admin
  user:
    token: secret
    exec:
      apiVersion: client.authentication.k8s.io/v1
      command: aws
      args: ["eks", "get-token"]
contexts:
- name: prod-admin
  context:
    cluster: prod
    user: admin
    namespace: kube-system
current-context: prod-admin
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse(SAMPLE.as_bytes()).unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.kind, "Config");
        assert_eq!(config.clusters.len(), 1);
        assert_eq!(
            config.clusters[0].cluster.server.as_deref(),
            Some("https://prod.example.com:6443")
        );
        assert_eq!(config.clusters[0].cluster.insecure_skip_tls_verify, Some(false));
        assert_eq!(config.users[0].user.token.as_deref(), Some("secret"));
        assert!(config.users[0].user.extra.contains_key("exec"));
        assert_eq!(config.contexts[0].context.cluster, "prod");
        assert_eq!(config.contexts[0].context.user, "admin");
        assert_eq!(config.contexts[0].context.namespace.as_deref(), Some("kube-system"));
        assert_eq!(config.current_context, "prod-admin");
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        assert_eq!(parse(b"").unwrap(), KubeConfig::default());
        assert_eq!(parse(b"  \n\t\n").unwrap(), KubeConfig::default());
    }

    #[test]
    fn test_null_lists_are_empty() {
        let config = parse(b"apiVersion: v1\nclusters: null\nusers:\ncontexts: []\n").unwrap();
        assert!(config.clusters.is_empty());
        assert!(config.users.is_empty());
        assert!(config.contexts.is_empty());
    }

    #[test]
    fn test_invalid_document_fails() {
        assert!(parse(b"clusters: [[[").is_err());
        assert!(parse(b"clusters: 42").is_err());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let doc = "clusters:\n- name: x\n  cluster: {}\n- name: x\n  cluster: {}\n";
        let err = parse(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("clusters: duplicate name \"x\""));

        let doc = "users:\n- name: u\n  user: {}\n- name: u\n  user: {}\n";
        assert!(parse(doc.as_bytes()).is_err());

        // The same name in different lists is fine
        let doc = "clusters:\n- name: x\n  cluster: {}\nusers:\n- name: x\n  user: {}\n";
        assert!(parse(doc.as_bytes()).is_ok());
    }

    #[test]
    fn test_reparse_preserves_unknown_fields() {
        let config = parse(SAMPLE.as_bytes()).unwrap();
        let bytes = serialize(&config).unwrap();
        let reparsed = parse(&bytes).unwrap();

        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_serialize_merged_writes_kubectl_field_names() {
        let mut merged = MergedConfig::from(parse(SAMPLE.as_bytes()).unwrap());
        merged.apply_format_defaults();

        let text = String::from_utf8(serialize_merged(&merged).unwrap()).unwrap();
        assert!(text.contains("apiVersion: v1"));
        assert!(text.contains("current-context: prod-admin"));
        assert!(text.contains("certificate-authority-data: Q0EK"));
        assert!(text.contains("preferences: {}"));
    }
}
