//! Host credential rules
//!
//! Rules are declared in the admin configuration and matched by host and,
//! optionally, host type (`github`, `gitlab`, `docker`, ...). Tokens may be
//! given inline or read from an environment variable at lookup time; they
//! are never logged.

use crate::domain::HostCredentials;
use serde::{Deserialize, Serialize};

/// A credential lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRuleQuery<'a> {
    /// Restrict to rules of this host type
    pub host_type: Option<&'a str>,
    /// Hostname, or a URL whose host is used
    pub host: &'a str,
}

impl<'a> HostRuleQuery<'a> {
    /// Query by host alone
    pub fn host(host: &'a str) -> Self {
        Self {
            host_type: None,
            host,
        }
    }

    /// Query by host type and host
    pub fn typed(host_type: &'a str, host: &'a str) -> Self {
        Self {
            host_type: Some(host_type),
            host,
        }
    }
}

/// Source of credentials for a host
pub trait HostRules: Send + Sync {
    /// Credentials for the query, `None` when nothing usable is configured
    fn find(&self, query: &HostRuleQuery<'_>) -> Option<HostCredentials>;
}

/// One configured credential rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct HostRule {
    /// Only match queries of this host type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_type: Option<String>,
    /// Host or URL to match; subdomains match too. Absent matches every host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_host: Option<String>,
    /// Environment variable holding the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    /// Inline credentials
    #[serde(flatten)]
    pub credentials: HostCredentials,
}

impl HostRule {
    /// Rule matching one host
    pub fn for_host(host: impl Into<String>, credentials: HostCredentials) -> Self {
        Self {
            match_host: Some(host.into()),
            credentials,
            ..Default::default()
        }
    }

    /// Restrict the rule to a host type (builder pattern)
    pub fn with_host_type(mut self, host_type: impl Into<String>) -> Self {
        self.host_type = Some(host_type.into());
        self
    }

    /// Read the token from an environment variable (builder pattern)
    pub fn with_token_env(mut self, var: impl Into<String>) -> Self {
        self.token_env = Some(var.into());
        self
    }

    /// Match score for a query; `None` when the rule does not apply
    ///
    /// Typed rules beat untyped ones, then longer host matches win.
    fn score(&self, query: &HostRuleQuery<'_>) -> Option<(bool, usize)> {
        let typed = match (&self.host_type, query.host_type) {
            (Some(rule), Some(wanted)) if rule == wanted => true,
            (Some(_), Some(_)) => return None,
            (Some(_), None) | (None, _) => false,
        };

        let host = normalize_host(query.host);
        let host_len = match self.match_host.as_deref().map(normalize_host) {
            None => 0,
            Some(pattern) if pattern.is_empty() => 0,
            Some(pattern) => {
                let matches = host == pattern
                    || host
                        .strip_suffix(pattern)
                        .is_some_and(|prefix| prefix.ends_with('.'));
                if !matches {
                    return None;
                }
                pattern.len()
            }
        };

        Some((typed, host_len))
    }

    /// Effective credentials, resolving `token_env`
    fn resolve(&self) -> HostCredentials {
        let mut credentials = self.credentials.clone();
        if credentials.token.is_none() {
            if let Some(var) = &self.token_env {
                credentials.token = std::env::var(var).ok().filter(|t| !t.is_empty());
            }
        }
        credentials
    }
}

/// Strip scheme, path, port and a leading `.` from a host pattern
fn normalize_host(value: &str) -> &str {
    let without_scheme = value.split_once("://").map_or(value, |(_, rest)| rest);
    let host_port = without_scheme.split('/').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();
    host.trim_start_matches('.')
}

/// An ordered list of host rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct HostRuleSet {
    rules: Vec<HostRule>,
}

impl HostRuleSet {
    /// Create a rule set
    pub fn new(rules: Vec<HostRule>) -> Self {
        Self { rules }
    }

    /// Adds a rule (builder pattern)
    pub fn with_rule(mut self, rule: HostRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Number of configured rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl HostRules for HostRuleSet {
    fn find(&self, query: &HostRuleQuery<'_>) -> Option<HostCredentials> {
        // Later rules win ties so configuration can override earlier defaults
        let best = self
            .rules
            .iter()
            .filter_map(|rule| rule.score(query).map(|score| (score, rule)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, rule)| rule)?;

        let credentials = best.resolve();
        if credentials.is_empty() {
            tracing::debug!("host rule for {} has no credentials", query.host);
            return None;
        }
        Some(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> HostRuleSet {
        HostRuleSet::default()
            .with_rule(HostRule::for_host(
                "git.enterprise.com",
                HostCredentials::token("generic"),
            ))
            .with_rule(
                HostRule::for_host("git.enterprise.com", HostCredentials::token("gh-token"))
                    .with_host_type("github"),
            )
            .with_rule(HostRule::for_host("empty.example.com", HostCredentials::default()))
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://git.example.com:8443/api"), "git.example.com");
        assert_eq!(normalize_host(".example.com"), "example.com");
        assert_eq!(normalize_host("example.com"), "example.com");
    }

    #[test]
    fn test_host_only_query() {
        let found = rules()
            .find(&HostRuleQuery::host("git.enterprise.com"))
            .unwrap();
        assert!(found.token.is_some());
    }

    #[test]
    fn test_typed_query_prefers_typed_rule() {
        let found = rules()
            .find(&HostRuleQuery::typed("github", "git.enterprise.com"))
            .unwrap();
        assert_eq!(found.token.as_deref(), Some("gh-token"));
    }

    #[test]
    fn test_typed_query_falls_back_to_untyped_rule() {
        let found = rules()
            .find(&HostRuleQuery::typed("gitlab", "git.enterprise.com"))
            .unwrap();
        assert_eq!(found.token.as_deref(), Some("generic"));
    }

    #[test]
    fn test_typed_rule_does_not_match_other_type() {
        let set = HostRuleSet::new(vec![HostRule::for_host(
            "gl.example.com",
            HostCredentials::token("t"),
        )
        .with_host_type("gitlab")]);
        assert!(set
            .find(&HostRuleQuery::typed("github", "gl.example.com"))
            .is_none());
        assert!(set
            .find(&HostRuleQuery::typed("gitlab", "gl.example.com"))
            .is_some());
    }

    #[test]
    fn test_subdomain_match() {
        let set = HostRuleSet::new(vec![HostRule::for_host(
            "example.com",
            HostCredentials::token("t"),
        )]);
        assert!(set.find(&HostRuleQuery::host("git.example.com")).is_some());
        assert!(set.find(&HostRuleQuery::host("badexample.com")).is_none());
    }

    #[test]
    fn test_empty_credentials_are_none() {
        assert!(rules()
            .find(&HostRuleQuery::host("empty.example.com"))
            .is_none());
        assert!(rules().find(&HostRuleQuery::host("unknown.com")).is_none());
    }

    #[test]
    fn test_token_env() {
        std::env::set_var("DEPSYNC_TEST_HOST_TOKEN", "from-env");
        let set = HostRuleSet::new(vec![HostRule::for_host(
            "env.example.com",
            HostCredentials::default(),
        )
        .with_token_env("DEPSYNC_TEST_HOST_TOKEN")]);
        let found = set.find(&HostRuleQuery::host("env.example.com")).unwrap();
        assert_eq!(found.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            host_rules: HostRuleSet,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [[host_rules]]
            host-type = "github"
            match-host = "github.enterprise.com"
            token = "abc"

            [[host_rules]]
            match-host = "nexus.example.com"
            username = "ci"
            password = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.host_rules.len(), 2);
        let found = parsed
            .host_rules
            .find(&HostRuleQuery::host("nexus.example.com"))
            .unwrap();
        assert_eq!(found.username.as_deref(), Some("ci"));
    }
}
