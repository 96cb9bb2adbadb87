//! Client for the test-catalog-service.
//!
//! Transport only: callers get `Result`s and decide how to degrade. The
//! policy that turns failures into low-confidence placeholders lives in
//! `entities::test_match`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::RefMatchError;
use crate::sources::auth::TokenProvider;

pub(crate) const CATALOG_API: &str = "test-catalog-service";

/// Documented upper bound on names per batch match request; longer term
/// lists are chunked by the orchestrator.
pub const MAX_BATCH_TERMS: usize = 50;

pub struct CatalogClient {
    client: reqwest::Client,
    base: String,
    organization: String,
    region: String,
    search_timeout: Duration,
    batch_timeout: Duration,
    auth: TokenProvider,
}

impl CatalogClient {
    pub fn new(config: &AppConfig, auth: TokenProvider) -> Result<Self, RefMatchError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: config.catalog_base.clone(),
            organization: config.organization.clone(),
            region: config.region.clone(),
            search_timeout: config.search_timeout,
            batch_timeout: config.batch_timeout,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Tenant header plus a bearer token when the provider yields one; a
    /// missing token is not an error here.
    async fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header("X-Organization-Code", &self.organization);
        match self.auth.get_token().await {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, RefMatchError> {
        let resp = req
            .send()
            .await
            .map_err(|source| RefMatchError::Transport {
                api: CATALOG_API.to_string(),
                source,
            })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| RefMatchError::Transport {
                api: CATALOG_API.to_string(),
                source,
            })?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RefMatchError::Api {
                api: CATALOG_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| RefMatchError::ApiJson {
            api: CATALOG_API.to_string(),
            source,
        })
    }

    /// Single-term fuzzy search. Candidates come back ranked by the catalog;
    /// callers take the first.
    pub async fn search(&self, term: &str) -> Result<CatalogSearchResponse, RefMatchError> {
        let url = self.endpoint("api/v1/tests");
        let req = self
            .client
            .get(&url)
            .query(&[("q", term)])
            .timeout(self.search_timeout);
        let req = self.authorize(req).await;
        self.send_json(req).await
    }

    /// Batch match, one order-aligned entry per input name.
    pub async fn match_batch(&self, names: &[String]) -> Result<CatalogMatchResponse, RefMatchError> {
        if names.len() > MAX_BATCH_TERMS {
            return Err(RefMatchError::InvalidArgument(format!(
                "Batch match is limited to {MAX_BATCH_TERMS} names per request"
            )));
        }

        let url = self.endpoint("api/v1/tests/match");
        let req = self
            .client
            .post(&url)
            .json(&CatalogMatchRequest {
                test_names: names,
                region: &self.region,
            })
            .timeout(self.batch_timeout);
        let req = self.authorize(req).await;
        self.send_json(req).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogMatchRequest<'a> {
    test_names: &'a [String],
    region: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSearchResponse {
    #[serde(default)]
    pub tests: Vec<CatalogTest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTest {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub search_score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMatchResponse {
    #[serde(default)]
    pub matches: Vec<CatalogMatchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMatchEntry {
    pub query: Option<String>,
    #[serde(default)]
    pub matched: bool,
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub search_score: i64,
}
