//! pre-commit manager
//!
//! Each hook repository pinned in `.pre-commit-config.yaml` is a dependency
//! on the repository's tags. Public GitHub and GitLab repositories resolve
//! directly; repositories on other hosts need configured credentials, which
//! also decide whether the host speaks the GitHub or the GitLab API.

use super::{Manager, ManagerId};
use crate::domain::{DatasourceId, DepType, DependencyDescriptor, ManagerExtractResult};
use crate::host_rules::{HostRuleQuery, HostRules};
use regex::Regex;
use serde_yaml::Value;
use std::sync::{Arc, LazyLock};

// Optional scheme, host, path, optional .git suffix
static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z+]+://)?(?:[^@/]+@)?([^/:]+)[/:](.+?)(?:\.git)?/?$").expect("valid regex")
});

/// Repositories that are not fetched from anywhere
const BUILTIN_REPOS: [&str; 2] = ["local", "meta"];

/// Manager for pre-commit hook configuration
pub struct PreCommitManager {
    host_rules: Arc<dyn HostRules>,
}

impl PreCommitManager {
    pub fn new(host_rules: Arc<dyn HostRules>) -> Self {
        Self { host_rules }
    }

    fn descriptor(&self, repo: &str, rev: &str) -> Option<DependencyDescriptor> {
        let caps = REPO_URL_RE.captures(repo)?;
        let host = caps.get(1)?.as_str();
        let path = caps.get(2)?.as_str();

        let dep = |datasource| {
            DependencyDescriptor::new(path, rev, datasource).with_dep_type(DepType::Repository)
        };
        match host {
            "github.com" => return Some(dep(DatasourceId::GithubTags)),
            "gitlab.com" => return Some(dep(DatasourceId::GitlabTags)),
            _ => {}
        }

        // A private host is only usable with a token for it
        let has_token = self
            .host_rules
            .find(&HostRuleQuery::host(host))
            .is_some_and(|creds| creds.token.as_deref().is_some_and(|t| !t.is_empty()));
        if !has_token {
            tracing::debug!("no credentials for {}, skipping {}", host, repo);
            return None;
        }

        let registry_url = format!("https://{}", host);
        let datasource = [
            ("github", DatasourceId::GithubTags),
            ("gitlab", DatasourceId::GitlabTags),
        ]
        .into_iter()
        .find(|(host_type, _)| {
            self.host_rules
                .find(&HostRuleQuery::typed(host_type, host))
                .is_some()
        })
        .map(|(_, datasource)| datasource);

        match datasource {
            Some(datasource) => Some(dep(datasource).with_registry_url(registry_url)),
            None => {
                tracing::debug!("unknown git host type for {}, skipping {}", host, repo);
                None
            }
        }
    }
}

impl Manager for PreCommitManager {
    fn id(&self) -> ManagerId {
        ManagerId::PreCommit
    }

    fn matches_file(&self, file_name: &str) -> bool {
        file_name == ".pre-commit-config.yaml" || file_name == ".pre-commit-config.yml"
    }

    fn extract_package_file(
        &self,
        content: Option<&str>,
        file_name: &str,
    ) -> Option<ManagerExtractResult> {
        let document: Value = match serde_yaml::from_str(content?) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("{}: invalid YAML: {}", file_name, e);
                return None;
            }
        };

        let repos = document.get("repos")?.as_sequence()?;
        let deps = repos
            .iter()
            .filter_map(|item| {
                let repo = item.get("repo")?;
                let rev = item.get("rev")?;
                match (repo.as_str(), rev.as_str()) {
                    (Some(repo), _) if BUILTIN_REPOS.contains(&repo) => None,
                    (Some(repo), Some(rev)) => self.descriptor(repo, rev),
                    _ => {
                        tracing::debug!("{}: repo and rev must be strings", file_name);
                        None
                    }
                }
            })
            .collect();

        ManagerExtractResult::from_deps(deps)
    }
}
