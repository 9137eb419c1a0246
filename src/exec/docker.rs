//! Containerized execution helpers
//!
//! - `docker run` argument construction
//! - Unique container names
//! - A process-wide record of images already pulled

use crate::error::ExecError;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Prefix of every container name
pub const CONTAINER_NAME_PREFIX: &str = "depsync";

/// Label attached to every container
pub const CONTAINER_LABEL: &str = "depsync_child";

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(0);

/// A container name no other invocation in this or another process uses
///
/// Shaped `depsync_<tool>_<pid>_<n>`.
pub fn container_name(tool: &str) -> String {
    let n = NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}_{}_{}_{}",
        CONTAINER_NAME_PREFIX,
        tool,
        std::process::id(),
        n
    )
}

/// Everything needed to build one `docker run` invocation
#[derive(Debug, Clone)]
pub struct DockerRun<'a> {
    /// Container name, see [`container_name`]
    pub name: &'a str,
    /// Full image reference including tag
    pub image: &'a str,
    /// Absolute repository root, mounted at the same path
    pub root: &'a Path,
    /// Absolute working directory inside the container
    pub cwd: &'a Path,
    /// Variables forwarded by name from the docker client's environment
    pub env_names: Vec<&'a str>,
    /// Program run inside the container
    pub program: &'a str,
    /// Program arguments
    pub args: &'a [String],
}

impl DockerRun<'_> {
    /// Arguments passed to the `docker` binary
    pub fn to_args(&self) -> Vec<String> {
        let root = self.root.display().to_string();
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            self.name.to_string(),
            "--label".to_string(),
            CONTAINER_LABEL.to_string(),
            "-v".to_string(),
            format!("{}:{}", root, root),
            "-w".to_string(),
            self.cwd.display().to_string(),
        ];
        for name in &self.env_names {
            args.push("-e".to_string());
            args.push(name.to_string());
        }
        args.push(self.image.to_string());
        args.push(self.program.to_string());
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Image reference from prefix, image name and tag
pub fn image_ref(prefix: &str, image: &str, tag: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}:{}", image, tag)
    } else {
        format!("{}/{}:{}", prefix, image, tag)
    }
}

/// Images already pulled by this process
///
/// Each image reference gets its own cell, so concurrent callers for the same
/// image wait on one pull while different images pull in parallel. A failed
/// pull leaves the cell empty and the next caller tries again.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

static GLOBAL_IMAGE_CACHE: LazyLock<Arc<ImageCache>> =
    LazyLock::new(|| Arc::new(ImageCache::new()));

impl ImageCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<ImageCache> {
        Arc::clone(&GLOBAL_IMAGE_CACHE)
    }

    fn cell(&self, image: &str) -> Arc<OnceCell<()>> {
        let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(images.entry(image.to_string()).or_default())
    }

    /// Run `pull` unless the image was already pulled successfully
    pub async fn prefetch<F, Fut>(&self, image: &str, pull: F) -> Result<(), ExecError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ExecError>>,
    {
        let cell = self.cell(image);
        cell.get_or_try_init(|| async {
            tracing::info!("pulling image {}", image);
            pull().await
        })
        .await?;
        Ok(())
    }

    /// Returns true if the image was pulled by this process
    pub fn is_prefetched(&self, image: &str) -> bool {
        let images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        images.get(image).is_some_and(|cell| cell.initialized())
    }

    /// Forget every pulled image
    pub fn reset(&self) {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Forget every image pulled by this process
pub fn reset_prefetched_images() {
    GLOBAL_IMAGE_CACHE.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_image_ref() {
        assert_eq!(
            image_ref("docker.io/library", "rust", "1.79"),
            "docker.io/library/rust:1.79"
        );
        assert_eq!(image_ref("ghcr.io/acme/", "golang", "latest"), "ghcr.io/acme/golang:latest");
        assert_eq!(image_ref("", "rust", "latest"), "rust:latest");
    }

    #[test]
    fn test_docker_run_args() {
        let root = PathBuf::from("/tmp/github/some/repo");
        let cwd = root.join("crates/one");
        let args = vec![
            "update".to_string(),
            "--manifest-path".to_string(),
            "Cargo.toml".to_string(),
        ];
        let run = DockerRun {
            name: "depsync_rust_42_0",
            image: "docker.io/library/rust:latest",
            root: &root,
            cwd: &cwd,
            env_names: vec!["HTTP_PROXY"],
            program: "cargo",
            args: &args,
        };

        assert_eq!(
            run.to_args().join(" "),
            "run --rm --name depsync_rust_42_0 --label depsync_child \
             -v /tmp/github/some/repo:/tmp/github/some/repo \
             -w /tmp/github/some/repo/crates/one -e HTTP_PROXY \
             docker.io/library/rust:latest cargo update --manifest-path Cargo.toml"
        );
    }

    #[test]
    fn test_container_names_are_unique() {
        let first = container_name("rust");
        let second = container_name("rust");
        assert_ne!(first, second);

        let pid = format!("_{}_", std::process::id());
        for name in [&first, &second] {
            assert!(name.starts_with("depsync_rust_"), "{}", name);
            assert!(name.contains(&pid), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_prefetch_pulls_once() {
        let cache = ImageCache::new();
        let pulls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .prefetch("rust:latest", || async {
                    pulls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(pulls.load(Ordering::SeqCst), 1);
        assert!(cache.is_prefetched("rust:latest"));
        assert!(!cache.is_prefetched("golang:latest"));
    }

    #[tokio::test]
    async fn test_failed_pull_is_retried() {
        let cache = ImageCache::new();
        let err = cache
            .prefetch("rust:latest", || async {
                Err(ExecError::ImagePull {
                    image: "rust:latest".to_string(),
                    message: "network down".to_string(),
                })
            })
            .await;
        assert!(err.is_err());
        assert!(!cache.is_prefetched("rust:latest"));

        cache.prefetch("rust:latest", || async { Ok(()) }).await.unwrap();
        assert!(cache.is_prefetched("rust:latest"));
    }

    #[tokio::test]
    async fn test_reset_forgets_images() {
        let cache = ImageCache::new();
        cache.prefetch("rust:latest", || async { Ok(()) }).await.unwrap();
        cache.reset();
        assert!(!cache.is_prefetched("rust:latest"));
    }

    #[tokio::test]
    async fn test_concurrent_prefetch_single_pull() {
        let cache = Arc::new(ImageCache::new());
        let pulls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let pulls = Arc::clone(&pulls);
                tokio::spawn(async move {
                    cache
                        .prefetch("golang:1.22", || async move {
                            pulls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok(())
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(pulls.load(Ordering::SeqCst), 1);
    }
}
