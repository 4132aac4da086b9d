use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use silt_config::shared::EsConnectionConfig;

use silt::destination::{BulkItemFailure, BulkResponse};
use silt::error::{Error, ErrorKind, SiltResult};

/// Thin HTTP client over the Elasticsearch endpoints the destination needs.
#[derive(Debug, Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

/// Bulk response payload, reduced to the fields the pipeline inspects.
#[derive(Debug, Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<RawBulkItem>,
}

/// One entry of the bulk response `items` array: a single-key object whose
/// key is the operation name.
#[derive(Debug, Deserialize)]
struct RawBulkItem {
    #[serde(alias = "index", alias = "create", alias = "update", alias = "delete")]
    outcome: RawBulkOutcome,
}

#[derive(Debug, Deserialize)]
struct RawBulkOutcome {
    #[serde(rename = "_index", default)]
    index: String,
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

impl EsClient {
    pub fn new(config: &EsConnectionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        builder
    }

    /// Submits an NDJSON bulk body and extracts per-item failures.
    pub async fn bulk(&self, body: String) -> SiltResult<BulkResponse> {
        let response = self
            .request(reqwest::Method::POST, "/_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::with_source(ErrorKind::DestinationBulkFailed, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::with_source(
                ErrorKind::DestinationBulkFailed,
                std::io::Error::other(format!("bulk request returned {status}: {detail}")),
            ));
        }

        let raw: RawBulkResponse = response
            .json()
            .await
            .map_err(|e| Error::with_source(ErrorKind::DestinationBulkFailed, e))?;

        if !raw.errors {
            return Ok(BulkResponse::default());
        }

        let failures = raw
            .items
            .into_iter()
            .filter(|item| item.outcome.error.is_some())
            .map(|item| BulkItemFailure {
                index: item.outcome.index,
                id: item.outcome.id,
                status: item.outcome.status,
                reason: item
                    .outcome
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(BulkResponse { failures })
    }

    pub async fn index_exists(&self, index: &str) -> SiltResult<bool> {
        let response = self
            .request(reqwest::Method::HEAD, &format!("/{index}"))
            .send()
            .await
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::IndexOperationFailed {
                        index: index.to_string(),
                    },
                    e,
                )
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Error::new(ErrorKind::IndexOperationFailed {
                index: format!("{index} (status {status})"),
            })),
        }
    }

    pub async fn create_index(&self, index: &str, settings: Value) -> SiltResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/{index}"))
            .json(&settings)
            .send()
            .await
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::IndexOperationFailed {
                        index: index.to_string(),
                    },
                    e,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::with_source(
                ErrorKind::IndexOperationFailed {
                    index: index.to_string(),
                },
                std::io::Error::other(format!("create returned {status}: {detail}")),
            ));
        }

        Ok(())
    }
}
