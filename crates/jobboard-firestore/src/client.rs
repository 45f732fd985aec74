//! Firestore REST API client.
//!
//! - Service account auth with a cached token (or the emulator's owner token)
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter on idempotent reads
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jobboard_models::UpdateResult;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Map;
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_query_results, record_request};
use crate::retry::{with_retry, RetryConfig};
use crate::store::{DocumentStore, FieldFilter, StoredDocument};
use crate::token_cache::Credentials;
use crate::types::{
    fields_from_json, Document, RunAggregationQueryRequest, RunAggregationQueryResponse,
    RunQueryRequest, RunQueryResponse, StructuredQuery, Value, COUNT_ALIAS,
};

const PRODUCTION_ENDPOINT: &str = "https://firestore.googleapis.com";

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// `host:port` of a Firestore emulator; disables OAuth when set
    pub emulator_host: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }

    /// Root URL of the documents of this database.
    pub fn documents_url(&self) -> String {
        let endpoint = match &self.emulator_host {
            Some(host) => format!("http://{}", host),
            None => PRODUCTION_ENDPOINT.to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            endpoint, self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    credentials: Credentials,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let credentials = if config.emulator_host.is_some() {
            Credentials::Emulator
        } else {
            Credentials::service_account_from_env()?
        };
        Self::with_credentials(config, credentials)
    }

    /// Create a client with explicit credentials.
    pub fn with_credentials(
        config: FirestoreConfig,
        credentials: Credentials,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobboard-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = config.documents_url();

        Ok(Self {
            http,
            config,
            base_url,
            credentials,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?)
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    /// Send an authorized request, refreshing the token once if Firestore
    /// reports it expired.
    async fn send<B>(&self, url: &str, build: B) -> FirestoreResult<Response>
    where
        B: Fn(&str) -> RequestBuilder,
    {
        let token = self.credentials.token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                format!("{} failed: {}", url, body),
            ));
        }

        self.credentials.invalidate().await;
        let token = self.credentials.token().await?;
        Ok(build(&token).send().await?)
    }

    // =========================================================================
    // Document operations
    // =========================================================================

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.with_retry("get_document", || {
            self.execute_request("get_document", collection, Some(doc_id), async {
                let response = self
                    .send(&url, |token| self.http.get(&url).bearer_auth(token))
                    .await?;

                match response.status() {
                    StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                    StatusCode::NOT_FOUND => Ok(None),
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
        })
        .await
    }

    /// Create a document under a caller-chosen ID.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json::<Document>().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Update the masked fields of an existing document.
    ///
    /// The `currentDocument.exists` precondition keeps Firestore from
    /// creating the document when it is missing.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[String],
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        params.push("currentDocument.exists=true".to_string());
        let url = format!(
            "{}?{}",
            self.document_path(collection, doc_id),
            params.join("&")
        );
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send(&url, |token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Query operations
    // =========================================================================

    /// Run a structured query against the database root.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query_collection(&query);
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.with_retry("run_query", || {
            self.execute_request("run_query", &collection, None, async {
                let response = self
                    .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                    .await?;

                match response.status() {
                    StatusCode::OK => {
                        let body = response.text().await.unwrap_or_default();
                        // runQuery returns a JSON array of RunQueryResponse objects
                        let responses: Vec<RunQueryResponse> =
                            serde_json::from_str(&body).map_err(|e| {
                                FirestoreError::InvalidResponse(format!(
                                    "Failed to parse runQuery response: {} (body prefix: {})",
                                    e,
                                    body_prefix(&body)
                                ))
                            })?;

                        let docs: Vec<Document> =
                            responses.into_iter().filter_map(|r| r.document).collect();
                        record_query_results(&collection, docs.len());
                        Ok(docs)
                    }
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
        })
        .await
    }

    /// Count the documents matched by a query with a `count` aggregation.
    pub async fn run_count(&self, query: StructuredQuery) -> FirestoreResult<u64> {
        let url = format!("{}:runAggregationQuery", self.base_url);
        let collection = query_collection(&query);
        let request = RunAggregationQueryRequest::count(query);

        self.with_retry("run_count", || {
            self.execute_request("run_count", &collection, None, async {
                let response = self
                    .send(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                    .await?;

                match response.status() {
                    StatusCode::OK => {
                        let body = response.text().await.unwrap_or_default();
                        let responses: Vec<RunAggregationQueryResponse> =
                            serde_json::from_str(&body).map_err(|e| {
                                FirestoreError::InvalidResponse(format!(
                                    "Failed to parse runAggregationQuery response: {} (body prefix: {})",
                                    e,
                                    body_prefix(&body)
                                ))
                            })?;

                        responses
                            .into_iter()
                            .filter_map(|r| r.result)
                            .find_map(|r| r.aggregate_fields.get(COUNT_ALIAS).and_then(Value::as_count))
                            .ok_or_else(|| {
                                FirestoreError::InvalidResponse(
                                    "runAggregationQuery returned no count".to_string(),
                                )
                            })
                    }
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
        })
        .await
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        with_retry(&self.config.retry, operation, op).await
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

fn query_collection(query: &StructuredQuery) -> String {
    query
        .from
        .first()
        .map(|c| c.collection_id.clone())
        .unwrap_or_default()
}

fn body_prefix(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn to_stored(doc: Document) -> FirestoreResult<StoredDocument> {
    let id = doc
        .id()
        .map(str::to_string)
        .ok_or_else(|| FirestoreError::InvalidResponse("document without a name".to_string()))?;
    Ok(StoredDocument {
        id,
        fields: doc.json_fields(),
    })
}

fn filtered_query(collection: &str, filter: Option<&FieldFilter>) -> StructuredQuery {
    let query = StructuredQuery::collection(collection);
    match filter {
        Some(f) => query.where_equal(f.field.clone(), Value::StringValue(f.value.clone())),
        None => query,
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> FirestoreResult<Vec<StoredDocument>> {
        self.run_query(filtered_query(collection, filter))
            .await?
            .into_iter()
            .map(to_stored)
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<StoredDocument>> {
        self.get_document(collection, id)
            .await?
            .map(to_stored)
            .transpose()
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, serde_json::Value>,
    ) -> FirestoreResult<()> {
        self.create_document(collection, id, fields_from_json(&fields))
            .await?;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, serde_json::Value>,
    ) -> FirestoreResult<UpdateResult> {
        let current = self
            .get(collection, id)
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, id)))?;

        let unchanged = fields
            .iter()
            .all(|(k, v)| current.fields.get(k) == Some(v));
        if unchanged {
            debug!(collection = %collection, id = %id, "Update is a no-op");
            return Ok(UpdateResult::matched(false));
        }

        let mask: Vec<String> = fields.keys().cloned().collect();
        self.update_document(collection, id, fields_from_json(&fields), &mask)
            .await?;
        Ok(UpdateResult::matched(true))
    }

    async fn count(&self, collection: &str, filter: Option<&FieldFilter>) -> FirestoreResult<u64> {
        self.run_count(filtered_query(collection, filter)).await
    }

    async fn ping(&self) -> FirestoreResult<()> {
        // A missing document still proves the database answered.
        self.get_document("_health", "_check").await.map(|_| ())
    }
}
