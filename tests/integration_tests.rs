//! Integration tests for depsync
//!
//! These tests verify:
//! - Manager extraction from realistic manifests
//! - Datasource lookups against a mock registry
//! - Lockfile regeneration on a real checkout with a scripted tool

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture directory creation helper
fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

mod manager_extraction {
    use depsync::domain::{DatasourceId, DepType, HostCredentials};
    use depsync::host_rules::{HostRule, HostRuleSet, HostRules};
    use depsync::manager::{ManagerId, ManagerRegistry};
    use std::path::Path;
    use std::sync::Arc;

    fn registry(rules: HostRuleSet) -> ManagerRegistry {
        let rules: Arc<dyn HostRules> = Arc::new(rules);
        ManagerRegistry::new(rules)
    }

    #[test]
    fn test_cargo_manifest_with_targets_and_renames() {
        let content = r#"[package]
name = "app"
version = "0.1.0"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
json = { package = "serde_json", version = "1.0" }
local = { path = "../local" }
shared = { workspace = true }

[dev-dependencies]
tempfile = "3.10"

[target.'cfg(unix)'.dependencies]
nix = "0.29"
"#;
        let managers = registry(HostRuleSet::default());
        let manager = managers.for_file(Path::new("crates/app/Cargo.toml")).unwrap();
        assert_eq!(manager.id(), ManagerId::Cargo);

        let deps = manager
            .extract_package_file(Some(content), "Cargo.toml")
            .unwrap()
            .deps;
        let names: Vec<&str> = deps.iter().map(|d| d.dep_name.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"serde"));
        assert!(names.contains(&"nix"));
        assert!(!names.contains(&"local"));
        assert!(!names.contains(&"shared"));

        let json = deps.iter().find(|d| d.dep_name == "json").unwrap();
        assert_eq!(json.package_name(), "serde_json");
        let tempfile = deps.iter().find(|d| d.dep_name == "tempfile").unwrap();
        assert_eq!(tempfile.dep_type, DepType::Dev);
        assert!(deps.iter().all(|d| d.datasource == DatasourceId::Crate));
    }

    #[test]
    fn test_go_mod_block_and_single_requires() {
        let content = r#"module example.com/app

go 1.22

require github.com/spf13/cobra v1.8.0

require (
	github.com/stretchr/testify v1.9.0
	golang.org/x/sys v0.20.0 // indirect
)

replace example.com/old => ../old
"#;
        let managers = registry(HostRuleSet::default());
        let manager = managers.get(ManagerId::Gomod).unwrap();
        let deps = manager.extract_package_file(Some(content), "go.mod").unwrap().deps;

        let names: Vec<&str> = deps.iter().map(|d| d.dep_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "github.com/spf13/cobra",
                "github.com/stretchr/testify",
                "golang.org/x/sys"
            ]
        );
        assert!(deps.iter().all(|d| d.datasource == DatasourceId::Go));
    }

    #[test]
    fn test_pre_commit_private_gitlab_host() {
        let content = r#"repos:
  - repo: https://github.com/pre-commit/pre-commit-hooks
    rev: v4.6.0
    hooks:
      - id: trailing-whitespace
  - repo: https://gitlab.example.com/tools/lint-hooks.git
    rev: 1.2.0
  - repo: https://git.example.org/tools/unknown
    rev: 0.1.0
  - repo: local
    hooks:
      - id: fmt
"#;
        let rules = HostRuleSet::default().with_rule(
            HostRule::for_host("gitlab.example.com", HostCredentials::token("glpat-secret"))
                .with_host_type("gitlab"),
        );
        let managers = registry(rules);
        let manager = managers
            .for_file(Path::new(".pre-commit-config.yaml"))
            .unwrap();
        let deps = manager
            .extract_package_file(Some(content), ".pre-commit-config.yaml")
            .unwrap()
            .deps;

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].dep_name, "pre-commit/pre-commit-hooks");
        assert_eq!(deps[0].datasource, DatasourceId::GithubTags);
        assert_eq!(deps[1].dep_name, "tools/lint-hooks");
        assert_eq!(deps[1].datasource, DatasourceId::GitlabTags);
        assert_eq!(deps[1].registry_urls, vec!["https://gitlab.example.com"]);
        assert_eq!(deps[1].dep_type, DepType::Repository);
    }

    #[test]
    fn test_unknown_file_has_no_manager() {
        let managers = registry(HostRuleSet::default());
        assert!(managers.for_file(Path::new("package.json")).is_none());
    }
}

mod datasource_lookup {
    use depsync::datasource::{DatasourceRegistry, HttpClient};
    use depsync::domain::{HostCredentials, LookupRequest};
    use depsync::error::DatasourceError;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry() -> DatasourceRegistry {
        DatasourceRegistry::with_client(HttpClient::new().unwrap().with_max_retries(0))
    }

    #[tokio::test]
    async fn test_crate_lookup_against_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crates/serde"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "crate": {
                    "homepage": "https://serde.rs",
                    "repository": "https://github.com/serde-rs/serde"
                },
                "versions": [
                    {"num": "1.0.200", "created_at": "2024-05-01T00:00:00Z", "yanked": false},
                    {"num": "1.0.199", "created_at": "2024-04-20T00:00:00Z", "yanked": true}
                ]
            })))
            .mount(&server)
            .await;

        let request = LookupRequest::new("crate", "serde").with_registry_url(server.uri());
        let result = registry().get_releases(&request).await.unwrap().unwrap();

        assert_eq!(result.releases.len(), 2);
        assert_eq!(result.homepage.as_deref(), Some("https://serde.rs"));
        assert_eq!(
            result.source_url.as_deref(),
            Some("https://github.com/serde-rs/serde")
        );
        assert!(result.find("1.0.199").unwrap().deprecated());
        assert!(!result.find("1.0.200").unwrap().deprecated());
    }

    #[tokio::test]
    async fn test_missing_package_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request =
            LookupRequest::new("crate", "does-not-exist").with_registry_url(server.uri());
        assert!(registry().get_releases(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credentials_reach_the_registry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "crate": {"homepage": null, "repository": null},
                "versions": [{"num": "0.1.0"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let anonymous = LookupRequest::new("crate", "internal").with_registry_url(server.uri());
        let err = registry().get_releases(&anonymous).await.unwrap_err();
        assert!(matches!(err, DatasourceError::AuthenticationError { .. }));

        let authorized = anonymous.with_credentials(HostCredentials::token("s3cret"));
        let result = registry().get_releases(&authorized).await.unwrap().unwrap();
        assert_eq!(result.releases[0].version, "0.1.0");
    }

    #[tokio::test]
    async fn test_unknown_datasource() {
        let request = LookupRequest::new("cpan", "Moose");
        let err = registry().get_releases(&request).await.unwrap_err();
        assert!(err.to_string().contains("unknown datasource"));
    }
}

mod artifact_regeneration {
    use super::*;
    use async_trait::async_trait;
    use depsync::artifacts::ArtifactEngine;
    use depsync::config::AdminConfig;
    use depsync::domain::{ArtifactOutcome, DatasourceId, DependencyDescriptor, UpdateArtifactsConfig};
    use depsync::error::ExecError;
    use depsync::exec::{CommandRunner, ExecOptions, ExecOutput, ToolExecutor};
    use depsync::fs::LocalFs;
    use depsync::git::Vcs;
    use depsync::manager::cargo::CargoArtifacts;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Stands in for cargo: rewrites Cargo.lock in its working directory
    struct FakeCargo {
        lockfile: Option<String>,
        calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandRunner for FakeCargo {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            options: &ExecOptions,
        ) -> Result<ExecOutput, ExecError> {
            assert_eq!(program, "cargo");
            self.calls
                .lock()
                .unwrap()
                .push((options.cwd.clone(), args.to_vec()));
            match &self.lockfile {
                Some(contents) => {
                    fs::write(options.cwd.join("Cargo.lock"), contents).unwrap();
                    Ok(ExecOutput::default())
                }
                None => Err(ExecError::NonZeroExit {
                    command: format!("cargo {}", args.join(" ")),
                    code: Some(101),
                    stdout: String::new(),
                    stderr: "error: no matching package named `serde` found".to_string(),
                }),
            }
        }
    }

    /// Committed lockfile contents
    struct Committed(Option<String>);

    #[async_trait]
    impl Vcs for Committed {
        async fn get_file(&self, _path: &Path) -> Option<String> {
            self.0.clone()
        }
    }

    fn engine(root: &Path, runner: Arc<FakeCargo>, committed: &str) -> ArtifactEngine {
        let config = AdminConfig::new(root);
        ArtifactEngine::with_collaborators(
            Arc::new(LocalFs::new(root)),
            Arc::new(Committed(Some(committed.to_string()))),
            ToolExecutor::new(&config).with_runner(runner),
        )
    }

    fn workspace() -> TempDir {
        let temp = create_test_dir();
        fs::create_dir_all(temp.path().join("crates/app")).unwrap();
        fs::write(temp.path().join("Cargo.lock"), "old lock").unwrap();
        fs::write(
            temp.path().join("crates/app/Cargo.toml"),
            "[dependencies]\nserde = \"1.0.100\"\n",
        )
        .unwrap();
        temp
    }

    fn serde_update() -> UpdateArtifactsConfig {
        UpdateArtifactsConfig::new(
            "crates/app/Cargo.toml",
            vec![DependencyDescriptor::new("serde", "1.0.200", DatasourceId::Crate)],
            "[dependencies]\nserde = \"1.0.200\"\n".to_string(),
        )
    }

    #[tokio::test]
    async fn test_workspace_lockfile_is_regenerated() {
        let temp = workspace();
        let runner = Arc::new(FakeCargo {
            lockfile: Some("new lock".to_string()),
            calls: Mutex::new(Vec::new()),
        });

        let outcome = engine(temp.path(), runner.clone(), "old lock")
            .update_artifacts(&CargoArtifacts, &serde_update())
            .await;

        let lockfiles = outcome.lockfiles();
        assert_eq!(lockfiles.len(), 1);
        assert_eq!(lockfiles[0].path, PathBuf::from("Cargo.lock"));
        assert_eq!(lockfiles[0].contents, "new lock");

        // The new manifest is on disk and the tool ran from the workspace root
        assert_eq!(
            fs::read_to_string(temp.path().join("crates/app/Cargo.toml")).unwrap(),
            "[dependencies]\nserde = \"1.0.200\"\n"
        );
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, temp.path().to_path_buf());
        assert_eq!(
            calls[0].1,
            vec![
                "update",
                "--manifest-path",
                "crates/app/Cargo.toml",
                "--package",
                "serde"
            ]
        );
    }

    #[tokio::test]
    async fn test_identical_lockfile_is_no_op() {
        let temp = workspace();
        let runner = Arc::new(FakeCargo {
            lockfile: Some("old lock".to_string()),
            calls: Mutex::new(Vec::new()),
        });

        let outcome = engine(temp.path(), runner, "old lock")
            .update_artifacts(&CargoArtifacts, &serde_update())
            .await;
        assert_eq!(outcome, ArtifactOutcome::NoOp);
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_with_stderr() {
        let temp = workspace();
        let runner = Arc::new(FakeCargo {
            lockfile: None,
            calls: Mutex::new(Vec::new()),
        });

        let outcome = engine(temp.path(), runner, "old lock")
            .update_artifacts(&CargoArtifacts, &serde_update())
            .await;

        match outcome {
            ArtifactOutcome::Failed(failure) => {
                assert_eq!(failure.lockfile, PathBuf::from("Cargo.lock"));
                assert!(failure.diagnostic.contains("no matching package"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
