//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Bearer/basic authentication from resolved host credentials
//! - Exponential backoff retry logic (max 3 retries) for 429, 5xx and transport errors
//! - `404`/`410` mapped to "no data" instead of an error

use crate::domain::{DatasourceId, HostCredentials, LookupRequest};
use crate::error::DatasourceError;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("depsync/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// Identifies a request in error messages and carries its credentials
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Package being looked up
    pub package: &'a str,
    /// Datasource performing the lookup
    pub datasource: DatasourceId,
    /// Credentials to attach
    pub credentials: Option<&'a HostCredentials>,
}

impl<'a> RequestContext<'a> {
    /// Build the context for a lookup request
    pub fn new(request: &'a LookupRequest, datasource: DatasourceId) -> Self {
        Self {
            package: &request.package_name,
            datasource,
            credentials: request.credentials.as_ref(),
        }
    }
}

/// One page of a paginated listing
#[derive(Debug)]
pub struct Page<T> {
    /// Parsed body
    pub body: T,
    /// URL of the next page from the `Link` header
    pub next: Option<String>,
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, DatasourceError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, DatasourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                DatasourceError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Perform a GET request with retry logic
    ///
    /// Returns `Ok(None)` when the registry reports the resource as missing.
    pub async fn get(
        &self,
        url: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<Response>, DatasourceError> {
        let datasource = ctx.datasource.as_str();
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Wait before retrying with exponential backoff
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }

            let mut request = self.client.get(url);
            if let Some(credentials) = ctx.credentials {
                request = authorize(request, credentials);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(DatasourceError::rate_limit_exceeded(datasource));
                        continue;
                    }

                    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                        tracing::debug!("{} has no data for {} ({})", datasource, ctx.package, status);
                        return Ok(None);
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(DatasourceError::AuthenticationError {
                            datasource: datasource.to_string(),
                            message: format!("HTTP {} for {}", status, url),
                        });
                    }

                    if status.is_server_error() {
                        last_error = Some(DatasourceError::network_error(
                            ctx.package,
                            datasource,
                            format!("HTTP {}", status),
                        ));
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DatasourceError::network_error(
                            ctx.package,
                            datasource,
                            format!("HTTP {}", status),
                        ));
                    }

                    return Ok(Some(response));
                }
                Err(e) => {
                    last_error = Some(if e.is_timeout() {
                        DatasourceError::timeout(ctx.package, datasource)
                    } else {
                        DatasourceError::network_error(ctx.package, datasource, e.to_string())
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DatasourceError::network_error(ctx.package, datasource, "unknown error")
        }))
    }

    /// Perform a GET request and parse the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<T>, DatasourceError> {
        Ok(self.get_json_page(url, ctx).await?.map(|page| page.body))
    }

    /// Perform a GET request, parse the JSON body and extract the next-page link
    pub async fn get_json_page<T: DeserializeOwned>(
        &self,
        url: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<Page<T>>, DatasourceError> {
        let Some(response) = self.get(url, ctx).await? else {
            return Ok(None);
        };

        let next = next_link(response.headers());
        let body = response.json::<T>().await.map_err(|e| {
            DatasourceError::invalid_response(
                ctx.package,
                ctx.datasource.as_str(),
                format!("failed to parse JSON: {}", e),
            )
        })?;

        Ok(Some(Page { body, next }))
    }

    /// Collect a JSON array listing across `Link: rel="next"` pages
    ///
    /// `Ok(None)` only when the first page is missing; later pages that
    /// disappear end the listing.
    pub async fn get_json_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        ctx: &RequestContext<'_>,
        max_pages: usize,
    ) -> Result<Option<Vec<T>>, DatasourceError> {
        let Some(first) = self.get_json_page::<Vec<T>>(url, ctx).await? else {
            return Ok(None);
        };

        let mut items = first.body;
        let mut next = first.next;
        let mut pages = 1;
        while let Some(url) = next.take() {
            if pages >= max_pages {
                tracing::debug!("stopping after {} pages for {}", pages, ctx.package);
                break;
            }
            let Some(page) = self.get_json_page::<Vec<T>>(&url, ctx).await? else {
                break;
            };
            items.extend(page.body);
            next = page.next;
            pages += 1;
        }

        Ok(Some(items))
    }

    /// Perform a GET request and return the body as text
    pub async fn get_text(
        &self,
        url: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<String>, DatasourceError> {
        let Some(response) = self.get(url, ctx).await? else {
            return Ok(None);
        };

        response.text().await.map(Some).map_err(|e| {
            DatasourceError::invalid_response(
                ctx.package,
                ctx.datasource.as_str(),
                format!("failed to get text response: {}", e),
            )
        })
    }
}

fn authorize(
    request: reqwest::RequestBuilder,
    credentials: &HostCredentials,
) -> reqwest::RequestBuilder {
    match (&credentials.token, &credentials.username) {
        (Some(token), _) if !token.is_empty() => request.bearer_auth(token),
        (_, Some(username)) => request.basic_auth(username, credentials.password.as_ref()),
        _ => request,
    }
}

/// Extract the `rel="next"` target from a `Link` header
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| matches!(p.trim(), "rel=\"next\"" | "rel=next"));
        if !is_next {
            return None;
        }
        Some(
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string(),
        )
    })
}
