//! Elasticsearch-backed vector store.
//!
//! Talks to the REST API directly: `dense_vector` mappings, NDJSON `_bulk`
//! writes and top-level `knn` search. Read-only calls are retried with
//! exponential backoff on connection errors, timeouts and 429/5xx answers.
//! Writes (`_bulk`, index create and delete) are sent once; repeating them
//! after an ambiguous failure could duplicate documents.

use crate::config::StoreConfig;
use crate::schema::{IndexSchema, Similarity, EMBEDDING_FIELD};
use crate::store::{BulkItemFailure, BulkOutcome, KnnQuery, VectorStore};
use crate::types::{Document, SearchHit, UNLABELED};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use semsearch_core::{AppError, AppResult};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Elasticsearch REST client.
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: u32,
}

impl ElasticsearchStore {
    /// Build a client for `config.host`. No request is sent until the first
    /// call; use [`VectorStore::ping`] to check connectivity.
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Elasticsearch: {}", e))
            })?;

        if !config.verify_certs {
            warn!("TLS certificate verification is disabled for {}", config.host);
        }

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_attempts: config.max_retries.max(1),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));

        match self.api_key {
            Some(ref key) => builder.header(header::AUTHORIZATION, format!("ApiKey {}", key)),
            None => builder,
        }
    }

    /// Send once, mapping transport failures to store errors.
    async fn send(&self, builder: RequestBuilder, what: &str) -> AppResult<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!("Elasticsearch {} timed out", what))
            } else if e.is_connect() || e.is_request() {
                AppError::StoreUnavailable(format!(
                    "Cannot reach Elasticsearch at {} ({}): {}",
                    self.base_url, what, e
                ))
            } else {
                AppError::Store(format!("Elasticsearch {} failed: {}", what, e))
            }
        })
    }

    /// Send an idempotent request, retrying transient failures.
    async fn send_with_retries<F>(&self, what: &str, build: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let retry_reason = match self.send(build(), what).await {
                Ok(response) if is_transient_status(response.status()) => {
                    if attempt >= self.max_attempts {
                        return Ok(response);
                    }
                    format!("status {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => e.to_string(),
                Err(e) => return Err(e),
            };

            let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
            warn!(
                "Elasticsearch {} failed (attempt {}/{}): {}, retrying in {}ms",
                what, attempt, self.max_attempts, retry_reason, backoff_ms
            );
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            attempt += 1;
        }
    }
}

/// Turn a non-success response into an error.
async fn ensure_success(response: Response, index: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body, index))
}

async fn read_json(response: Response, what: &str) -> AppResult<Value> {
    response.json::<Value>().await.map_err(|e| {
        AppError::Serialization(format!("Failed to parse Elasticsearch {} response: {}", what, e))
    })
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Map an HTTP error status to the error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str, index: &str) -> AppError {
    let reason = error_reason(body);

    match status {
        StatusCode::NOT_FOUND => AppError::IndexNotFound(index.to_string()),
        s if is_transient_status(s) => {
            AppError::StoreUnavailable(format!("Elasticsearch answered {}: {}", s, reason))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Store(format!(
            "Permission denied on index '{}' ({}): {}",
            index, status, reason
        )),
        s => AppError::Store(format!("Elasticsearch answered {}: {}", s, reason)),
    }
}

/// Extract `error.type: error.reason` from an Elasticsearch error body.
fn error_reason(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    match value.get("error") {
        Some(Value::Object(error)) => {
            let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
            let reason = error.get("reason").and_then(Value::as_str).unwrap_or("");
            format!("{}: {}", kind, reason)
        }
        Some(Value::String(s)) => s.clone(),
        _ => body.trim().to_string(),
    }
}

/// Index creation body for a schema.
pub(crate) fn mapping_body(schema: &IndexSchema) -> Value {
    let mut meta = serde_json::Map::new();
    if let Some(ref provider) = schema.embedding_provider {
        meta.insert("embedding_provider".to_string(), json!(provider));
    }
    if let Some(ref model) = schema.embedding_model {
        meta.insert("embedding_model".to_string(), json!(model));
    }

    let mut properties = serde_json::Map::new();
    properties.insert("text".to_string(), json!({ "type": "text" }));
    properties.insert("label".to_string(), json!({ "type": "integer" }));
    properties.insert(
        schema.field.clone(),
        json!({
            "type": "dense_vector",
            "dims": schema.dimensions,
            "index": schema.indexed,
            "similarity": schema.similarity.as_str(),
        }),
    );

    json!({
        "mappings": {
            "_meta": meta,
            "properties": properties,
        }
    })
}

/// Recover the vector schema from a `GET /{index}/_mapping` response.
pub(crate) fn schema_from_mapping(response: &Value) -> AppResult<Option<IndexSchema>> {
    // Keyed by concrete index name, which differs from the request when an
    // alias was used.
    let Some(mappings) = response
        .as_object()
        .and_then(|indices| indices.values().next())
        .and_then(|index| index.get("mappings"))
    else {
        return Ok(None);
    };

    let properties = mappings.get("properties").and_then(Value::as_object);
    let vector_field = properties.and_then(|props| {
        props
            .get(EMBEDDING_FIELD)
            .map(|v| (EMBEDDING_FIELD.to_string(), v))
            .filter(|(_, v)| v.get("type").and_then(Value::as_str) == Some("dense_vector"))
            .or_else(|| {
                props
                    .iter()
                    .find(|(_, v)| v.get("type").and_then(Value::as_str) == Some("dense_vector"))
                    .map(|(k, v)| (k.clone(), v))
            })
    });

    let Some((field, definition)) = vector_field else {
        return Err(AppError::SchemaMismatch(
            "Index has no dense_vector field".to_string(),
        ));
    };

    let dimensions = definition
        .get("dims")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            AppError::SchemaMismatch(format!("Vector field '{}' declares no dims", field))
        })? as usize;

    let similarity = match definition.get("similarity").and_then(Value::as_str) {
        Some(s) => s.parse()?,
        None => Similarity::Cosine,
    };

    let meta = mappings.get("_meta");
    let meta_str = |key: &str| {
        meta.and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(Some(IndexSchema {
        field,
        dimensions,
        indexed: definition
            .get("index")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        similarity,
        embedding_provider: meta_str("embedding_provider"),
        embedding_model: meta_str("embedding_model"),
    }))
}

/// NDJSON body for `POST /_bulk`.
pub(crate) fn bulk_body(index: &str, documents: &[Document]) -> AppResult<String> {
    let action = serde_json::to_string(&json!({ "index": { "_index": index } }))?;
    let mut body = String::new();
    for document in documents {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }
    Ok(body)
}

/// Per-item outcome of a `_bulk` response.
pub(crate) fn parse_bulk_response(response: &Value, submitted: usize) -> AppResult<BulkOutcome> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Store("Bulk response has no items".to_string()))?;

    if items.len() != submitted {
        return Err(AppError::Store(format!(
            "Bulk response has {} items for {} submitted documents",
            items.len(),
            submitted
        )));
    }

    let mut outcome = BulkOutcome::default();
    for (position, item) in items.iter().enumerate() {
        let result = item.as_object().and_then(|actions| actions.values().next());
        let status = result
            .and_then(|r| r.get("status"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16;

        if (200..300).contains(&status) {
            outcome.succeeded += 1;
        } else {
            let reason = result
                .and_then(|r| r.get("error"))
                .map(|e| error_reason(&e.to_string()))
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| format!("status {}", status));
            outcome.failures.push(BulkItemFailure {
                position,
                status,
                reason,
            });
        }
    }

    Ok(outcome)
}

/// Body for a top-level `knn` search.
pub(crate) fn search_body(query: &KnnQuery) -> Value {
    json!({
        "knn": {
            "field": query.field,
            "query_vector": query.query_vector,
            "k": query.k,
            "num_candidates": query.num_candidates,
        },
        "_source": ["text", "label"],
        "size": query.k,
    })
}

/// Hits of a `_search` response, in the order the store ranked them.
pub(crate) fn parse_search_response(response: &Value) -> AppResult<Vec<SearchHit>> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Store("Search response has no hits".to_string()))?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(text) = hit.pointer("/_source/text").and_then(Value::as_str) else {
            let id = hit.get("_id").and_then(Value::as_str).unwrap_or("<none>");
            warn!("Skipping hit without text: {}", id);
            continue;
        };

        results.push(SearchHit {
            id: hit
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: text.to_string(),
            label: hit
                .pointer("/_source/label")
                .and_then(Value::as_i64)
                .unwrap_or(UNLABELED),
            score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
        });
    }

    Ok(results)
}

#[async_trait]
impl VectorStore for ElasticsearchStore {
    fn backend_name(&self) -> &str {
        "elasticsearch"
    }

    #[instrument(skip(self), fields(host = %self.base_url))]
    async fn ping(&self) -> AppResult<()> {
        let response = self
            .send_with_retries("ping", || self.request(Method::GET, "/"))
            .await?;
        ensure_success(response, "").await?;
        debug!("Elasticsearch at {} is reachable", self.base_url);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        let response = self
            .send_with_retries("index exists", || self.request(Method::HEAD, name))
            .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(status_error(s, "", name)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> AppResult<()> {
        let response = self
            .send(self.request(Method::DELETE, name), "delete index")
            .await?;
        ensure_success(response, name).await?;
        Ok(())
    }

    #[instrument(skip(self, schema), fields(dims = schema.dimensions))]
    async fn create_index(&self, name: &str, schema: &IndexSchema) -> AppResult<()> {
        let response = self
            .send(
                self.request(Method::PUT, name).json(&mapping_body(schema)),
                "create index",
            )
            .await?;
        ensure_success(response, name).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn index_schema(&self, name: &str) -> AppResult<Option<IndexSchema>> {
        let path = format!("{}/_mapping", name);
        let response = self
            .send_with_retries("get mapping", || self.request(Method::GET, &path))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success(response, name).await?;
        schema_from_mapping(&read_json(response, "mapping").await?)
    }

    #[instrument(skip(self, documents), fields(batch_size = documents.len()))]
    async fn bulk_write(&self, name: &str, documents: &[Document]) -> AppResult<BulkOutcome> {
        if documents.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let body = bulk_body(name, documents)?;
        let response = self
            .send(
                self.request(Method::POST, "_bulk")
                    .header(header::CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
                "bulk write",
            )
            .await?;

        let response = ensure_success(response, name).await?;
        parse_bulk_response(&read_json(response, "bulk").await?, documents.len())
    }

    #[instrument(skip(self, query), fields(k = query.k, num_candidates = query.num_candidates))]
    async fn vector_search(&self, name: &str, query: &KnnQuery) -> AppResult<Vec<SearchHit>> {
        query.validate()?;

        let path = format!("{}/_search", name);
        let body = search_body(query);
        let response = self
            .send_with_retries("search", || self.request(Method::POST, &path).json(&body))
            .await?;

        let response = ensure_success(response, name).await?;
        parse_search_response(&read_json(response, "search").await?)
    }

    #[instrument(skip(self))]
    async fn refresh(&self, name: &str) -> AppResult<()> {
        let path = format!("{}/_refresh", name);
        let response = self
            .send_with_retries("refresh", || self.request(Method::POST, &path))
            .await?;
        ensure_success(response, name).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count(&self, name: &str) -> AppResult<u64> {
        let path = format!("{}/_count", name);
        let response = self
            .send_with_retries("count", || self.request(Method::GET, &path))
            .await?;

        let response = ensure_success(response, name).await?;
        read_json(response, "count")
            .await?
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| AppError::Store("Count response has no count".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn schema(dimensions: usize) -> IndexSchema {
        IndexSchema {
            field: EMBEDDING_FIELD.to_string(),
            dimensions,
            indexed: true,
            similarity: Similarity::Cosine,
            embedding_provider: Some("ollama".to_string()),
            embedding_model: Some("nomic-embed-text".to_string()),
        }
    }

    fn unreachable_store() -> ElasticsearchStore {
        ElasticsearchStore::new(&StoreConfig {
            host: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            max_retries: 1,
            ..Default::default()
        })
        .unwrap()
    }

    fn store_at(host: String, max_retries: u32) -> ElasticsearchStore {
        ElasticsearchStore::new(&StoreConfig {
            host,
            request_timeout_secs: 5,
            max_retries,
            ..Default::default()
        })
        .unwrap()
    }

    /// Reads one HTTP request, headers and body. False if the peer hung up.
    async fn read_request(socket: &mut TcpStream) -> bool {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
            }
        };

        let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while data.len() < header_end + content_length {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
            }
        }
        true
    }

    /// HTTP server answering the n-th request with `responses[n]`; the last
    /// response repeats. Returns its base URL and a request counter.
    async fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                if !read_request(&mut socket).await {
                    continue;
                }
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];
                let reply = format!(
                    "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), requests)
    }

    /// HTTP server that accepts connections and never answers.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    drop(socket);
                });
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_mapping_body_declares_dense_vector() {
        let body = mapping_body(&schema(768));
        let field = &body["mappings"]["properties"]["embedding"];

        assert_eq!(field["type"], "dense_vector");
        assert_eq!(field["dims"], 768);
        assert_eq!(field["index"], true);
        assert_eq!(field["similarity"], "cosine");
        assert_eq!(body["mappings"]["_meta"]["embedding_model"], "nomic-embed-text");
    }

    #[test]
    fn test_schema_round_trips_through_mapping() {
        let original = schema(768);
        let created = mapping_body(&original);
        let response = json!({ "imdb-000001": created });

        let recovered = schema_from_mapping(&response).unwrap().unwrap();
        assert_eq!(recovered, original);
    }

    #[test]
    fn test_schema_from_mapping_without_meta() {
        let response = json!({
            "imdb": { "mappings": { "properties": {
                "vec": { "type": "dense_vector", "dims": 384 },
                "text": { "type": "text" }
            }}}
        });

        let recovered = schema_from_mapping(&response).unwrap().unwrap();
        assert_eq!(recovered.field, "vec");
        assert_eq!(recovered.dimensions, 384);
        assert_eq!(recovered.similarity, Similarity::Cosine);
        assert!(recovered.embedding_model.is_none());
    }

    #[test]
    fn test_schema_from_mapping_without_vector_field() {
        let response = json!({
            "imdb": { "mappings": { "properties": { "text": { "type": "text" } } } }
        });
        assert!(matches!(
            schema_from_mapping(&response),
            Err(AppError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let docs = vec![
            Document::from_embedding("first".into(), Some(1), vec![0.1, 0.2], 2).unwrap(),
            Document::from_embedding("second".into(), None, vec![0.3, 0.4], 2).unwrap(),
        ];

        let body = bulk_body("imdb", &docs).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "imdb");
        let source: Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(source["text"], "second");
        assert_eq!(source["label"], -1);
    }

    #[test]
    fn test_parse_bulk_response_mixed_outcome() {
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [embedding]"
                }}},
                { "index": { "_id": "c", "status": 201 } }
            ]
        });

        let outcome = parse_bulk_response(&response, 3).unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].position, 1);
        assert_eq!(outcome.failures[0].status, 400);
        assert!(outcome.failures[0].reason.contains("mapper_parsing_exception"));
    }

    #[test]
    fn test_parse_bulk_response_count_mismatch() {
        let response = json!({ "errors": false, "items": [ { "index": { "status": 201 } } ] });
        assert!(parse_bulk_response(&response, 2).is_err());
    }

    #[test]
    fn test_search_body_shape() {
        let query = KnnQuery {
            field: "embedding".to_string(),
            query_vector: vec![0.5, 0.5],
            k: 5,
            num_candidates: 100,
        };

        let body = search_body(&query);
        assert_eq!(body["knn"]["k"], 5);
        assert_eq!(body["knn"]["num_candidates"], 100);
        assert_eq!(body["knn"]["field"], "embedding");
        assert_eq!(body["size"], 5);
    }

    #[test]
    fn test_parse_search_response() {
        let response = json!({
            "hits": { "hits": [
                { "_id": "1", "_score": 0.93, "_source": { "text": "A great Italian mini-series", "label": 1 } },
                { "_id": "2", "_score": 0.41, "_source": { "label": 0 } },
                { "_id": "3", "_score": 0.40, "_source": { "text": "A terrible action movie" } }
            ]}
        });

        let hits = parse_search_response(&response).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "A great Italian mini-series");
        assert_eq!(hits[0].label, 1);
        assert!((hits[0].score - 0.93).abs() < 1e-6);
        assert_eq!(hits[1].label, UNLABELED);
    }

    #[test]
    fn test_status_error_mapping() {
        let not_found = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [imdb]"},"status":404}"#;
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, not_found, "imdb"),
            AppError::IndexNotFound(ref name) if name == "imdb"
        ));
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "", "imdb").is_retryable());

        let forbidden = status_error(StatusCode::FORBIDDEN, "{}", "imdb");
        assert!(matches!(forbidden, AppError::Store(_)));
        assert!(forbidden.to_string().contains("Permission denied"));

        let bad = r#"{"error":{"type":"illegal_argument_exception","reason":"dims must be > 0"}}"#;
        assert!(status_error(StatusCode::BAD_REQUEST, bad, "imdb")
            .to_string()
            .contains("illegal_argument_exception: dims must be > 0"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let store = unreachable_store();

        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)), "got {:?}", err);
        assert!(err.is_fatal_for_ingest());
    }

    #[tokio::test]
    async fn test_unreachable_bulk_write_is_fatal() {
        let store = unreachable_store();
        let docs = vec![Document::from_embedding("x".into(), None, vec![1.0], 1).unwrap()];

        let err = store.bulk_write("imdb", &docs).await.unwrap_err();
        assert!(err.is_fatal_for_ingest());
    }

    #[tokio::test]
    async fn test_count_retries_transient_status() {
        let (host, requests) = stub_server(vec![(503, "{}"), (200, r#"{"count":7}"#)]).await;
        let store = store_at(host, 3);

        assert_eq!(store.count("imdb").await.unwrap(), 7);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mapping_retries_transient_status() {
        let mapping = r#"{"imdb":{"mappings":{"properties":{"embedding":{"type":"dense_vector","dims":4}}}}}"#;
        let (host, requests) = stub_server(vec![(503, "{}"), (200, mapping)]).await;
        let store = store_at(host, 3);

        let schema = store.index_schema("imdb").await.unwrap().unwrap();
        assert_eq!(schema.dimensions, 4);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retries_stop_at_max_attempts() {
        let (host, requests) = stub_server(vec![(503, "{}")]).await;
        let store = store_at(host, 2);

        let err = store.count("imdb").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)), "got {:?}", err);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bulk_write_is_sent_once() {
        let (host, requests) =
            stub_server(vec![(503, "{}"), (200, r#"{"errors":false,"items":[]}"#)]).await;
        let store = store_at(host, 3);
        let docs = vec![Document::from_embedding("x".into(), None, vec![1.0], 1).unwrap()];

        let err = store.bulk_write("imdb", &docs).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)), "got {:?}", err);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_and_create_are_sent_once() {
        let (host, requests) = stub_server(vec![(503, "{}")]).await;
        let store = store_at(host, 3);

        assert!(store.delete_index("imdb").await.is_err());
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        assert!(store.create_index("imdb", &schema(4)).await.is_err());
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let store = ElasticsearchStore::new(&StoreConfig {
            host: silent_server().await,
            request_timeout_secs: 1,
            max_retries: 1,
            ..Default::default()
        })
        .unwrap();

        let err = store.count("imdb").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)), "got {:?}", err);
        assert!(err.is_fatal_for_ingest());
    }
}
