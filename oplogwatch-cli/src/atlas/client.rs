//! Atlas Admin API client
//!
//! Thin reqwest wrapper over the five endpoints the report reads. Requests
//! are answered with a digest challenge first; the client retries once with
//! the computed `Authorization` header.

use std::time::Duration;

use async_trait::async_trait;
use oplogwatch_shared::{
    format_timestamp, Cluster, ClusterRecord, ErrorBody, MeasurementQuery, MeasurementSeries, MeasurementsResponse,
    Page, PaginatedResponse, Process, ProcessArgsRecord, ProcessRecord, Project, ProjectRecord,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::digest::{new_cnonce, DigestChallenge, DigestCredentials};
use super::{ApiError, InventoryProvider};
use crate::paginate::collect_all;

/// Public Atlas Admin API endpoint
pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v1.0";

/// Atlas client configuration
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Programmatic API public key
    pub public_key: String,
    /// Programmatic API private key
    pub private_key: String,
    /// `itemsPerPage` for cluster and process listings
    pub page_size: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            public_key: String::new(),
            private_key: String::new(),
            page_size: 50,
            timeout_secs: 30,
        }
    }
}

/// HTTP implementation of [`InventoryProvider`]
pub struct AtlasClient {
    client: Client,
    base_url: String,
    credentials: DigestCredentials,
    page_size: u32,
}

impl AtlasClient {
    pub fn new(config: AtlasConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: DigestCredentials::new(config.public_key, config.private_key),
            page_size: config.page_size.max(1),
        })
    }

    /// Build an endpoint URL from already-encoded path segments
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::Parse(format!("Invalid URL {}{}: {}", self.base_url, path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET with a digest challenge round trip
    async fn get(&self, url: Url) -> Result<Response, ApiError> {
        trace!("GET {}", url);

        let response = self.send(url.clone(), None).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(DigestChallenge::parse)
            .ok_or_else(|| ApiError::Auth("Server did not offer digest authentication".to_string()))?;

        let uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let authorization = self
            .credentials
            .authorization(&challenge, "GET", &uri, 1, &new_cnonce())
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let response = self.send(url, Some(authorization)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("Credentials rejected: {}", body)));
        }
        Ok(response)
    }

    async fn send(&self, url: Url, authorization: Option<String>) -> Result<Response, ApiError> {
        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request timed out: {}", e)
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            ApiError::Network(message)
        })
    }

    /// GET and decode a JSON body, mapping error bodies onto [`ApiError`]
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.get(url).await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        if body.is_invalid_metric_name() {
            return Err(ApiError::MetricUnsupported(body.detail.unwrap_or(text)));
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            code: body.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            detail: body.detail.or(body.reason).unwrap_or(text),
        })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page_num: u32,
        items_per_page: u32,
    ) -> Result<PaginatedResponse<T>, ApiError> {
        let url = self.url(
            path,
            &[
                ("pageNum", page_num.to_string()),
                ("itemsPerPage", items_per_page.to_string()),
                ("includeCount", "true".to_string()),
            ],
        )?;
        self.get_json(url).await
    }
}

#[async_trait]
impl InventoryProvider for AtlasClient {
    async fn list_projects(&self, page_num: u32, items_per_page: u32) -> Result<Page<Project>, ApiError> {
        let response: PaginatedResponse<ProjectRecord> = self.get_page("/groups", page_num, items_per_page).await?;
        debug!("Projects page {}: {} of {}", page_num, response.results.len(), response.total_count);
        Ok(response.into_page(Project::from))
    }

    async fn list_clusters(&self, project_id: &str) -> Result<Vec<Cluster>, ApiError> {
        let path = format!("/groups/{}/clusters", urlencoding::encode(project_id));
        let path = path.as_str();

        collect_all(self.page_size, move |page_num, size| async move {
            let response: PaginatedResponse<ClusterRecord> = self.get_page(path, page_num, size).await?;
            Ok::<_, ApiError>(response.into_page(Cluster::from))
        })
        .await
    }

    async fn get_oplog_size_mb(&self, project_id: &str, cluster_name: &str) -> Result<Option<i64>, ApiError> {
        let path = format!(
            "/groups/{}/clusters/{}/processArgs",
            urlencoding::encode(project_id),
            urlencoding::encode(cluster_name)
        );
        let args: ProcessArgsRecord = self.get_json(self.url(&path, &[])?).await?;
        Ok(args.oplog_size_mb)
    }

    async fn list_processes(&self, project_id: &str) -> Result<Vec<Process>, ApiError> {
        let path = format!("/groups/{}/processes", urlencoding::encode(project_id));
        let path = path.as_str();

        collect_all(self.page_size, move |page_num, size| async move {
            let response: PaginatedResponse<ProcessRecord> = self.get_page(path, page_num, size).await?;
            Ok::<_, ApiError>(response.into_page(Process::from))
        })
        .await
    }

    async fn get_measurements(
        &self,
        project_id: &str,
        host: &str,
        port: u16,
        query: &MeasurementQuery,
    ) -> Result<Vec<MeasurementSeries>, ApiError> {
        let path = format!(
            "/groups/{}/processes/{}:{}/measurements",
            urlencoding::encode(project_id),
            urlencoding::encode(host),
            port
        );

        let mut params = vec![
            ("granularity", query.granularity.clone()),
            ("start", format_timestamp(&query.start)),
            ("end", format_timestamp(&query.end)),
        ];
        params.extend(query.metrics.iter().map(|m| ("m", m.as_str().to_string())));

        let response: MeasurementsResponse = self.get_json(self.url(&path, &params)?).await?;
        Ok(response.measurements.into_iter().map(MeasurementSeries::from).collect())
    }
}
