//! Raw-text retrieval for the three input datasets.
//!
//! No retries and no timeouts: a failed fetch fails every stage downstream
//! of it.

use crate::error::{PipelineError, Result};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use tracing::debug;

pub trait ResourceFetcher: Send + Sync {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Fetches over HTTP(S).
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            debug!("GET {resource}");
            let resp = self
                .client
                .get(resource)
                .send()
                .await
                .map_err(|e| PipelineError::network(resource, e.to_string()))?;

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| PipelineError::network(resource, e.to_string()))?;

            if !status.is_success() {
                return Err(PipelineError::network(resource, body));
            }
            Ok(body)
        })
    }
}

/// Reads from the local filesystem.
#[derive(Default)]
pub struct FileFetcher;

impl ResourceFetcher for FileFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            debug!("reading {resource}");
            tokio::fs::read_to_string(resource)
                .await
                .map_err(|e| PipelineError::network(resource, e.to_string()))
        })
    }
}

/// Picks HTTP for `http://`/`https://` resources and the filesystem for
/// everything else.
#[derive(Default)]
pub struct SourceFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn is_remote(resource: &str) -> bool {
    resource.starts_with("http://") || resource.starts_with("https://")
}

impl ResourceFetcher for SourceFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<String>> {
        if is_remote(resource) {
            self.http.fetch(resource)
        } else {
            self.file.fetch(resource)
        }
    }
}

/// Serves pre-loaded documents, e.g. for callers that embed the datasets.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(resource.into(), body.into());
        self
    }
}

impl ResourceFetcher for MemoryFetcher {
    fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<String>> {
        let found = self.documents.get(resource).cloned();
        Box::pin(async move {
            found.ok_or_else(|| PipelineError::network(resource, "404 Not Found"))
        })
    }
}
