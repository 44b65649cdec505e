use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{info, instrument, warn};

use crate::config::ConfigError;
use crate::error::SyncError;
use crate::linkedin::model::{AccessTokenResp, CatalogPage};

pub mod model;

/// The upstream rejects larger pages with a 403.
pub const PAGE_SIZE: usize = 100;

const FIELDS: &str = "urn,title:(value),details:(availableLocales,description,classifications,contributors,images,publishedAt,urls:(webLaunch))";

pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("learning-feeds/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Exchanges client credentials for a bearer token valid for one run.
#[derive(Clone)]
pub struct TokenProvider {
    http: Client,
    token_url: Url,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(http: Client, token_url: Url) -> Self {
        Self { http, token_url }
    }

    /// Fails with a configuration error before any I/O when either secret is
    /// blank.
    #[instrument(skip_all, fields(url = %self.token_url))]
    pub async fn acquire(&self, client_id: &str, client_secret: &str) -> Result<String, SyncError> {
        if client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("CLIENT_ID must be non-empty").into());
        }
        if client_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("CLIENT_SECRET must be non-empty").into());
        }

        info!("requesting credentials");
        let res = self
            .http
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|err| SyncError::Auth(format!("failed to reach token endpoint: {err}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let payload: AccessTokenResp = res
            .json()
            .await
            .map_err(|err| SyncError::Auth(format!("invalid token response: {err}")))?;
        if payload.access_token.is_empty() {
            return Err(SyncError::Auth("token endpoint returned an empty token".into()));
        }
        info!(expires_in = ?payload.expires_in, "credentials acquired");
        Ok(payload.access_token)
    }
}

/// A paginated source of catalog pages.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// URL of the first page of the collection.
    fn first_page_url(&self) -> Url;

    /// Resolve a `paging.links[].href` into an absolute URL.
    fn resolve_next(&self, href: &str) -> Result<Url, SyncError>;

    async fn fetch_page(&self, url: &Url) -> Result<CatalogPage, SyncError>;
}

#[derive(Clone)]
pub struct LearningClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for LearningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LearningClient {
    pub fn new(http: Client, base_url: Url, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn build_request(&self, url: &Url) -> reqwest::Result<reqwest::Request> {
        self.http
            .get(url.clone())
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .build()
    }
}

#[async_trait]
impl CatalogSource for LearningClient {
    fn first_page_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("v2/learningAssets");
        url.query_pairs_mut()
            .clear()
            .append_pair("q", "localeAndType")
            .append_pair("assetType", "COURSE")
            .append_pair("sourceLocale.language", "en")
            .append_pair("sourceLocale.country", "US")
            .append_pair("expandDepth", "1")
            .append_pair("includeRetired", "false")
            .append_pair("fields", FIELDS)
            .append_pair("start", "0")
            .append_pair("count", &PAGE_SIZE.to_string());
        url
    }

    fn resolve_next(&self, href: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(href)
            .map_err(|err| SyncError::Upstream(format!("invalid next link {href:?}: {err}")))
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &Url) -> Result<CatalogPage, SyncError> {
        let request = self
            .build_request(url)
            .map_err(|err| SyncError::Upstream(format!("failed to build catalog request: {err}")))?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| SyncError::Upstream(format!("failed to reach catalog: {err}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "catalog request rejected");
            return Err(SyncError::Upstream(format!("catalog returned {status}: {body}")));
        }

        let body = res
            .text()
            .await
            .map_err(|err| SyncError::Upstream(format!("failed to read catalog page: {err}")))?;
        serde_json::from_str(&body)
            .map_err(|err| SyncError::Upstream(format!("malformed catalog page: {err}")))
    }
}
