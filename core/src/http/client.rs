use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ProjectCreateRequest, ProjectResolveRequest, ProjectResponse};

/// JSON client for the project-identity backend.
///
/// Failures are terminal for the triggering action: a non-2xx response
/// surfaces as `API error <status>: <body>` and nothing is retried.
pub struct ApiClient {
    inner: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Self {
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("failed to build reqwest client");
        Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.inner.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("API error {}: {}", status.as_u16(), text);
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn create_project(&self, project_name: &str, base_url: &str) -> Result<ProjectResponse> {
        self.post_json(
            "/projects/create",
            &ProjectCreateRequest {
                project_name: project_name.to_string(),
                base_url: base_url.to_string(),
            },
        )
        .await
    }

    pub async fn resolve_project(&self, project_key: &str) -> Result<ProjectResponse> {
        self.post_json(
            "/projects/resolve",
            &ProjectResolveRequest {
                project_key: project_key.to_string(),
            },
        )
        .await
    }
}
