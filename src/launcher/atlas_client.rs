//! Minimal client for the Atlas Administration API v2.
//!
//! Authenticates with a service account (OAuth 2 client credentials) and
//! covers the cluster endpoints the launcher needs.

use crate::constants::ATLAS_API_MEDIA_TYPE;
use crate::core::LauncherError;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

/// Cluster as returned by `GET /groups/{groupId}/clusters/{name}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasCluster {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub connection_strings: Option<ConnectionStrings>,
    #[serde(default, rename = "mongoDBVersion")]
    pub mongodb_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default)]
    pub standard_srv: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authenticated Atlas API client. The access token is fetched on first use.
pub struct AtlasClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: OnceCell<String>,
}

impl AtlasClient {
    #[must_use]
    pub fn new(base_url: &str, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: OnceCell::new(),
        }
    }

    async fn token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let url = format!("{}/api/oauth/token", self.base_url);
                debug!("Requesting Atlas access token from {}", url);
                let response = self
                    .http
                    .post(&url)
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .header(ACCEPT, "application/json")
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await
                    .with_context(|| format!("Failed to reach {url}"))?;

                if !response.status().is_success() {
                    return Err(api_error(response).await);
                }
                let body: TokenResponse = response.json().await.context("Invalid Atlas token response")?;
                Ok::<_, anyhow::Error>(body.access_token)
            })
            .await?;
        Ok(token)
    }

    fn clusters_url(&self, project_id: &str) -> String {
        format!("{}/api/atlas/v2/groups/{}/clusters", self.base_url, project_id)
    }

    fn cluster_url(&self, project_id: &str, name: &str) -> String {
        format!("{}/{}", self.clusters_url(project_id), name)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.token().await?;
        request
            .bearer_auth(token)
            .header(ACCEPT, ATLAS_API_MEDIA_TYPE)
            .send()
            .await
            .context("Failed to reach the Atlas Administration API")
    }

    fn with_json(request: RequestBuilder, body: &Value) -> RequestBuilder {
        request.header(CONTENT_TYPE, ATLAS_API_MEDIA_TYPE).body(body.to_string())
    }

    /// `POST /groups/{projectId}/clusters`.
    pub async fn create_cluster(&self, project_id: &str, body: &Value) -> Result<AtlasCluster> {
        let request = Self::with_json(self.http.post(self.clusters_url(project_id)), body);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.context("Invalid Atlas cluster response")
    }

    /// `GET /groups/{projectId}/clusters/{name}`; `None` when Atlas reports 404.
    pub async fn get_cluster(&self, project_id: &str, name: &str) -> Result<Option<AtlasCluster>> {
        let response = self.send(self.http.get(self.cluster_url(project_id, name))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(Some(response.json().await.context("Invalid Atlas cluster response")?))
    }

    /// Pause or resume a cluster.
    pub async fn set_paused(&self, project_id: &str, name: &str, paused: bool) -> Result<AtlasCluster> {
        let body = serde_json::json!({ "paused": paused });
        let request = Self::with_json(self.http.patch(self.cluster_url(project_id, name)), &body);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.context("Invalid Atlas cluster response")
    }

    /// Delete a cluster. Returns `false` if it no longer existed.
    pub async fn delete_cluster(&self, project_id: &str, name: &str) -> Result<bool> {
        let response = self.send(self.http.delete(self.cluster_url(project_id, name))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(true)
    }
}

/// Turn a non-2xx response into [`LauncherError::AtlasApiError`], preferring
/// the `detail` Atlas puts in its error documents.
async fn api_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<Value> = serde_json::from_str(&body).ok();

    let field = |name: &str| {
        parsed.as_ref().and_then(|v| v.get(name)).and_then(Value::as_str).map(str::to_string)
    };
    let detail = field("detail")
        .or_else(|| field("errorCode"))
        .or_else(|| field("error_description"))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    LauncherError::AtlasApiError {
        status: status.as_u16(),
        detail,
    }
    .into()
}
