//! Child process environment
//!
//! Tools never inherit the full host environment. Only the variables below,
//! plus whatever a caller asks for explicitly, are passed through.

use std::collections::BTreeMap;

/// Host variables every child process receives when set
const BASIC_ENV_VARS: &[&str] = &[
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
    "HOME",
    "PATH",
    "USER",
    "LANG",
    "LC_ALL",
    "TMPDIR",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
    "DOCKER_HOST",
    "DOCKER_TLS_VERIFY",
    "DOCKER_CERT_PATH",
    "CARGO_HOME",
    "RUSTUP_HOME",
];

/// Build the environment for a child process
///
/// `passthrough` names extra host variables to copy; `extra` entries are set
/// verbatim and win over host values.
pub fn child_process_env(
    passthrough: &[&str],
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    child_process_env_from(|name| std::env::var(name).ok(), passthrough, extra)
}

fn child_process_env_from(
    lookup: impl Fn(&str) -> Option<String>,
    passthrough: &[&str],
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = BASIC_ENV_VARS
        .iter()
        .chain(passthrough)
        .filter_map(|name| lookup(name).map(|value| (name.to_string(), value)))
        .collect();
    env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> Option<String> {
        match name {
            "PATH" => Some("/usr/bin".to_string()),
            "HOME" => Some("/home/bot".to_string()),
            "GOPROXY" => Some("https://proxy.example.com".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("nope".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_basic_vars_pass_through() {
        let env = child_process_env_from(host, &[], &BTreeMap::new());
        assert_eq!(env.get("PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(env.get("HOME").map(String::as_str), Some("/home/bot"));
        assert!(!env.contains_key("AWS_SECRET_ACCESS_KEY"));
        assert!(!env.contains_key("GOPROXY"));
    }

    #[test]
    fn test_requested_vars_pass_through() {
        let env = child_process_env_from(host, &["GOPROXY", "GOFLAGS"], &BTreeMap::new());
        assert_eq!(
            env.get("GOPROXY").map(String::as_str),
            Some("https://proxy.example.com")
        );
        assert!(!env.contains_key("GOFLAGS"));
    }

    #[test]
    fn test_extra_overrides_host() {
        let mut extra = BTreeMap::new();
        extra.insert("HOME".to_string(), "/tmp/home".to_string());
        extra.insert("CARGO_TERM_COLOR".to_string(), "never".to_string());
        let env = child_process_env_from(host, &[], &extra);
        assert_eq!(env.get("HOME").map(String::as_str), Some("/tmp/home"));
        assert_eq!(env.get("CARGO_TERM_COLOR").map(String::as_str), Some("never"));
    }
}
