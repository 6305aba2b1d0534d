//! OpenSearch provider implementation.
//!
//! The concrete [`SearchEngineProvider`] backed by the OpenSearch crate's
//! HTTP transport. Every call carries the configured hard timeout and a
//! bounded retry-with-backoff budget for transient failures; 4xx
//! responses are surfaced immediately and never retried.

use async_trait::async_trait;
use opensearch::auth::Credentials;
use opensearch::http::request::JsonBody;
use opensearch::http::response::Response;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts,
    IndicesPutMappingParts,
};
use opensearch::{BulkParts, CountParts, OpenSearch, SearchParts};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, error, info};
use url::Url;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::interfaces::SearchEngineProvider;
use crate::types::{BulkResponse, BulkSummary, EngineSearchResponse};
use sitesearch_shared::IndexDocument;

/// OpenSearch provider implementation.
///
/// A thin transport facade: it issues the documented REST calls, applies
/// auth and timeouts, classifies failures into the engine error
/// taxonomy, and retries only the transient class.
pub struct OpenSearchProvider {
    client: OpenSearch,
    config: EngineConfig,
}

impl OpenSearchProvider {
    /// Create a new provider from the given engine configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let parsed_url = Url::parse(&config.endpoint)
            .map_err(|e| EngineError::validation(format!("invalid engine URL: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }

        let transport = builder
            .build()
            .map_err(|e| EngineError::unavailable(e.to_string()))?;

        info!(
            endpoint = %config.endpoint,
            timeout_secs = config.request_timeout.as_secs(),
            max_retries = config.max_retries,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            config,
        })
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.config.retry_base_delay.as_millis().max(1) as u64)
            .max_delay(self.config.retry_max_delay)
            .map(jitter)
            .take(self.config.max_retries)
    }

    /// Run an engine call under the bounded retry policy. Only transient
    /// errors re-enter the loop.
    async fn with_retry<T, F, Fut>(&self, action: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        RetryIf::spawn(self.retry_strategy(), action, EngineError::is_transient).await
    }

    /// Classify a non-success response: 5xx is transient unavailability,
    /// 4xx is a rejection that must not be retried.
    async fn ensure_success(response: Response) -> Result<Response, EngineError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            error!(status = code, body = %body, "Engine request failed");
            Err(EngineError::unavailable(format!(
                "engine returned {}: {}",
                code, body
            )))
        } else {
            error!(status = code, body = %body, "Engine rejected request");
            Err(EngineError::rejected(code, body))
        }
    }

    /// Flat action/source pairs for a bulk upsert body.
    fn bulk_upsert_actions(documents: &[IndexDocument]) -> Result<Vec<Value>, EngineError> {
        let mut actions = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            actions.push(json!({ "index": { "_id": doc.document_id() } }));
            actions.push(
                serde_json::to_value(doc).map_err(|e| EngineError::serialization(e.to_string()))?,
            );
        }
        Ok(actions)
    }

    /// Delete actions for a bulk delete body.
    fn bulk_delete_actions(ids: &[u64]) -> Vec<Value> {
        ids.iter()
            .map(|id| json!({ "delete": { "_id": id.to_string() } }))
            .collect()
    }

    async fn raw_ping(&self) -> Result<(), EngineError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn raw_index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        Self::ensure_success(response).await?;
        Ok(true)
    }

    async fn raw_create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;

        match Self::ensure_success(response).await {
            Ok(_) => {
                debug!(index = %index, "Index created");
                Ok(())
            }
            // A retried create can find the first attempt landed.
            Err(EngineError::Rejected { reason, .. })
                if reason.contains("resource_already_exists_exception") =>
            {
                debug!(index = %index, "Index already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn raw_delete_index(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        Self::ensure_success(response).await?;
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn raw_put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        Self::ensure_success(response).await?;
        debug!(index = %index, "Mapping applied");
        Ok(())
    }

    async fn raw_mapping_version(&self, index: &str) -> Result<Option<u32>, EngineError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))?;

        // The top-level key is the concrete index name, even when queried
        // through an alias.
        let version = body
            .as_object()
            .and_then(|o| o.values().next())
            .and_then(|idx| idx.pointer("/mappings/_meta/version"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        Ok(Some(version))
    }

    async fn raw_count_documents(&self, index: &str) -> Result<u64, EngineError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        let response = Self::ensure_success(response).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))?;

        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| EngineError::parse("count response missing 'count' field".to_string()))
    }

    async fn raw_swap_alias(
        &self,
        alias: &str,
        old_index: Option<&str>,
        new_index: &str,
    ) -> Result<(), EngineError> {
        let mut actions = Vec::new();
        if let Some(old) = old_index {
            actions.push(json!({ "remove": { "index": old, "alias": alias } }));
        }
        actions.push(json!({ "add": { "index": new_index, "alias": alias } }));

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        Self::ensure_success(response).await?;
        info!(alias = %alias, new_index = %new_index, "Alias repointed");
        Ok(())
    }

    async fn raw_bulk(
        &self,
        index: &str,
        actions: &[Value],
    ) -> Result<BulkSummary, EngineError> {
        let body: Vec<JsonBody<Value>> = actions.iter().cloned().map(JsonBody::new).collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        let response = Self::ensure_success(response).await?;
        let bulk: BulkResponse = response
            .json()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))?;

        Ok(BulkSummary::from_response(&bulk))
    }

    async fn raw_search(
        &self,
        indices: &[String],
        body: &Value,
    ) -> Result<EngineSearchResponse, EngineError> {
        let index_refs: Vec<&str> = indices.iter().map(String::as_str).collect();

        let response = self
            .client
            .search(SearchParts::Index(&index_refs))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| EngineError::unavailable(e.to_string()))?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<EngineSearchResponse>()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))
    }
}

#[async_trait]
impl SearchEngineProvider for OpenSearchProvider {
    async fn ping(&self) -> Result<(), EngineError> {
        self.with_retry(|| self.raw_ping()).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        self.with_retry(|| self.raw_index_exists(index)).await
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        self.with_retry(|| self.raw_create_index(index, body)).await
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        self.with_retry(|| self.raw_delete_index(index)).await
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
        self.with_retry(|| self.raw_put_mapping(index, mapping))
            .await
    }

    async fn mapping_version(&self, index: &str) -> Result<Option<u32>, EngineError> {
        self.with_retry(|| self.raw_mapping_version(index)).await
    }

    async fn count_documents(&self, index: &str) -> Result<u64, EngineError> {
        self.with_retry(|| self.raw_count_documents(index)).await
    }

    async fn swap_alias(
        &self,
        alias: &str,
        old_index: Option<&str>,
        new_index: &str,
    ) -> Result<(), EngineError> {
        self.with_retry(|| self.raw_swap_alias(alias, old_index, new_index))
            .await
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, EngineError> {
        if documents.is_empty() {
            return Ok(BulkSummary::default());
        }
        let actions = Self::bulk_upsert_actions(documents)?;
        debug!(index = %index, count = documents.len(), "Issuing bulk upsert");
        self.with_retry(|| self.raw_bulk(index, &actions)).await
    }

    async fn bulk_delete(&self, index: &str, ids: &[u64]) -> Result<BulkSummary, EngineError> {
        if ids.is_empty() {
            return Ok(BulkSummary::default());
        }
        let actions = Self::bulk_delete_actions(ids);
        debug!(index = %index, count = ids.len(), "Issuing bulk delete");
        self.with_retry(|| self.raw_bulk(index, &actions)).await
    }

    async fn search(
        &self,
        indices: &[String],
        body: &Value,
    ) -> Result<EngineSearchResponse, EngineError> {
        self.with_retry(|| self.raw_search(indices, body)).await
    }
}
