//! Daemon End-to-End Tests

use anyhow::Result;
use kubemerger::kubeconfig::{self, KubeConfig};
use kubemerger::{Config, Daemon, ShutdownCoordinator};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

fn create_test_config(root: &Path, output: &Path) -> Config {
    let mut config = Config::default();
    config.watch.root_dir = root.to_path_buf();
    config.watch.output = output.to_path_buf();
    config.watch.exclude = vec![];
    config.watch.debounce = Duration::from_millis(200);
    config.watch.shutdown_timeout = Duration::from_secs(2);
    config
}

fn create_kubeconfig(name: &str) -> String {
    format!(
        r#"apiVersion: v1
kind: Config
clusters:
- name: {name}
  cluster:
    server: https://{name}.example.com
users:
- name: {name}
  user:
    token: secret
contexts:
- name: {name}
  context:
    cluster: {name}
    user: {name}
current-context: {name}
"#
    )
}

fn read_output(path: &Path) -> Option<KubeConfig> {
    let bytes = fs::read(path).ok()?;
    kubeconfig::parse(&bytes).ok()
}

fn cluster_names(config: &KubeConfig) -> Vec<String> {
    let mut names: Vec<String> = config.clusters.iter().map(|c| c.name.clone()).collect();
    names.sort();
    names
}

/// Poll the output file until its clusters are exactly `expected`
async fn wait_for_clusters(output: &Path, expected: &[&str]) -> KubeConfig {
    let result = timeout(WAIT, async {
        loop {
            if let Some(config) = read_output(output) {
                if cluster_names(&config) == expected {
                    return config;
                }
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    match result {
        Ok(config) => config,
        Err(_) => panic!(
            "Output never contained clusters {:?}, last seen {:?}",
            expected,
            read_output(output).map(|c| cluster_names(&c))
        ),
    }
}

#[tokio::test]
async fn test_daemon_keeps_output_in_sync() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    let output = root.join("config");
    fs::write(root.join("dev.yaml"), create_kubeconfig("default"))?;

    let daemon = Daemon::new(&create_test_config(&root, &output));
    let coordinator = ShutdownCoordinator::new();
    let shutdown_rx = coordinator.subscribe();
    let handle = tokio::spawn(async move { daemon.run(shutdown_rx).await });

    // Initial sync; the output lives inside the root but is never merged
    let merged = wait_for_clusters(&output, &["dev"]).await;
    assert_eq!(merged.current_context, "dev");

    fs::write(root.join("prod.yaml"), create_kubeconfig("admin"))?;
    let merged = wait_for_clusters(&output, &["dev", "prod-admin"]).await;
    assert_eq!(merged.current_context, "dev");

    fs::remove_file(root.join("dev.yaml"))?;
    let merged = wait_for_clusters(&output, &["prod-admin"]).await;
    assert_eq!(merged.current_context, "prod-admin");

    coordinator.trigger();
    timeout(WAIT, handle).await???;
    Ok(())
}

#[tokio::test]
async fn test_parse_failure_keeps_daemon_running() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    let output = temp_dir.path().join("out").join("merged");
    let kube = root.join("kube");
    fs::create_dir_all(&kube)?;
    fs::write(kube.join("a"), create_kubeconfig("x"))?;

    let daemon = Daemon::new(&create_test_config(&kube, &output));
    let coordinator = ShutdownCoordinator::new();
    let handle = tokio::spawn({
        let shutdown_rx = coordinator.subscribe();
        async move { daemon.run(shutdown_rx).await }
    });

    wait_for_clusters(&output, &["a-x"]).await;

    // A broken file fails the merge; the last good output stays in place
    fs::write(kube.join("broken"), "clusters: [unclosed")?;
    sleep(Duration::from_millis(600)).await;
    assert_eq!(
        read_output(&output).map(|c| cluster_names(&c)),
        Some(vec!["a-x".to_string()])
    );
    assert!(!handle.is_finished());

    fs::remove_file(kube.join("broken"))?;
    fs::write(kube.join("b"), create_kubeconfig("y"))?;
    wait_for_clusters(&output, &["a-x", "b-y"]).await;

    coordinator.trigger();
    timeout(WAIT, handle).await???;
    Ok(())
}

#[tokio::test]
async fn test_daemon_fails_on_missing_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("missing");
    let output = temp_dir.path().join("config");

    let daemon = Daemon::new(&create_test_config(&root, &output));
    let coordinator = ShutdownCoordinator::new();

    let result = timeout(WAIT, daemon.run(coordinator.subscribe())).await?;
    assert!(result.is_err());
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_sync_once_writes_merged_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    let output = root.join("config");
    fs::create_dir_all(root.join("cache"))?;
    fs::write(root.join("a.yaml"), create_kubeconfig("one"))?;
    fs::write(root.join("b.yaml"), create_kubeconfig("two"))?;
    fs::write(root.join("cache").join("junk"), "not: [valid")?;
    // A stale output from an earlier run must not be merged into itself
    fs::write(&output, create_kubeconfig("stale"))?;

    let mut config = create_test_config(&root, &output);
    config.watch.exclude = vec![root.join("cache")];
    let daemon = Daemon::new(&config);

    assert_eq!(daemon.sync_once()?, 2);

    let merged = read_output(&output).expect("output is a kubeconfig");
    assert_eq!(cluster_names(&merged), vec!["a-one", "b-two"]);
    assert_eq!(merged.current_context, "a-one");
    Ok(())
}

#[test]
fn test_daemon_excludes_output_path() {
    let config = create_test_config(Path::new("/kube"), Path::new("/kube/config"));
    let daemon = Daemon::new(&config);

    assert!(daemon
        .exclusions()
        .contains(&PathBuf::from("/kube/config")));
}
