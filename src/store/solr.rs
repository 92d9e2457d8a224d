use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::models::Document;
use crate::store::client::{FacetCount, FilterOp, IndexStore, QueryRequest, QueryResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Solr-style HTTP implementation of [`IndexStore`].
///
/// Queries carry a short timeout; the write path gets a generous one and a
/// `commitWithin` durability hint. Concurrent calls are bounded by a
/// semaphore sized to the store's acceptable connection count.
pub struct SolrClient {
    base_url: String,
    http: reqwest::Client,
    query_timeout: Duration,
    update_timeout: Duration,
    connections: Arc<Semaphore>,
}

impl SolrClient {
    /// Build a client from configuration. Does not touch the network;
    /// call [`SolrClient::connect`] to verify the store is reachable.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            update_timeout: Duration::from_secs(config.update_timeout_secs),
            connections: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Verify the store answers at all. Failure here is fatal to a run;
    /// there is nothing useful to do without the store.
    pub async fn connect(&self) -> Result<()> {
        let _permit = self.acquire().await?;
        let resp = self
            .http
            .get(format!("{}/solr/admin/ping", self.base_url))
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("store unreachable: {e}")))?;
        if resp.status().is_success() {
            tracing::info!(base_url = %self.base_url, "Connected to index store");
            Ok(())
        } else {
            Err(AppError::Network(format!(
                "store ping returned {}",
                resp.status()
            )))
        }
    }

    async fn acquire(&self) -> Result<tokio::sync::OwnedSemaphorePermit> {
        self.connections
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("connection semaphore closed: {e}")))
    }

    /// Escape characters with query syntax meaning in a filter value.
    fn escape(value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if matches!(c, '"' | '(' | ')' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    /// Join filter terms into a query string: `field:"value" AND ...`.
    fn build_query(request: &QueryRequest) -> String {
        if request.filter.is_empty() {
            return "*:*".to_string();
        }
        let op = match request.op {
            FilterOp::And => " AND ",
            FilterOp::Or => " OR ",
        };
        request
            .filter
            .iter()
            .map(|(field, value)| format!("{}:\"{}\"", field, Self::escape(value)))
            .collect::<Vec<_>>()
            .join(op)
    }

    fn map_status(status: reqwest::StatusCode, body: &str) -> AppError {
        if status.is_client_error() {
            AppError::Validation(format!("store rejected request ({status}): {body}"))
        } else {
            AppError::Store(format!("store returned {status}: {body}"))
        }
    }

    fn parse_response(body: Value) -> Result<QueryResponse> {
        let response = body
            .get("response")
            .ok_or_else(|| AppError::Store("select result missing response".to_string()))?;
        let num_found = response
            .get("numFound")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let docs = response
            .get("docs")
            .and_then(Value::as_array)
            .map(|docs| {
                docs.iter()
                    .filter_map(|d| d.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();

        // facet_fields arrive as flat [value, count, value, count, ...] lists
        let mut facets = HashMap::new();
        if let Some(fields) = body
            .pointer("/facet_counts/facet_fields")
            .and_then(Value::as_object)
        {
            for (name, flat) in fields {
                let Some(flat) = flat.as_array() else { continue };
                let counts = flat
                    .chunks_exact(2)
                    .filter_map(|pair| {
                        Some(FacetCount {
                            value: pair[0].as_str()?.to_string(),
                            count: pair[1].as_u64()?,
                        })
                    })
                    .collect();
                facets.insert(name.clone(), counts);
            }
        }

        Ok(QueryResponse {
            num_found,
            docs,
            facets,
        })
    }
}

#[async_trait]
impl IndexStore for SolrClient {
    async fn get_document(&self, key: &str) -> Result<Option<Document>> {
        let request = QueryRequest::new().filter("key", key).rows(1);
        let mut response = self.query(&request).await?;
        Ok(if response.docs.is_empty() {
            None
        } else {
            Some(response.docs.remove(0))
        })
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let _permit = self.acquire().await?;

        let mut params: Vec<(String, String)> = vec![
            ("wt".to_string(), "json".to_string()),
            ("q".to_string(), Self::build_query(request)),
            ("start".to_string(), "0".to_string()),
        ];
        if !request.fields.is_empty() {
            params.push(("fl".to_string(), request.fields.join(",")));
        }
        if let Some(rows) = request.rows {
            params.push(("rows".to_string(), rows.to_string()));
        }
        if let Some(ref sort) = request.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        if !request.facets.is_empty() {
            params.push(("facet".to_string(), "true".to_string()));
            for facet in &request.facets {
                params.push(("facet.field".to_string(), facet.clone()));
            }
            if let Some(mincount) = request.facet_mincount {
                params.push(("facet.mincount".to_string(), mincount.to_string()));
            }
        }

        let url = format!("{}/select", self.base_url);
        tracing::debug!(url = %url, q = %Self::build_query(request), "Store query");
        let resp = self
            .http
            .get(&url)
            .query(&params)
            .timeout(self.query_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }

        Self::parse_response(resp.json().await?)
    }

    async fn upsert_document(&self, doc: Document) -> Result<()> {
        self.bulk_upsert(std::slice::from_ref(&doc), 60_000).await
    }

    async fn bulk_upsert(&self, docs: &[Document], commit_within_ms: u64) -> Result<()> {
        let _permit = self.acquire().await?;

        let url = format!(
            "{}/solr/update?commitWithin={}",
            self.base_url, commit_within_ms
        );
        let resp = self
            .http
            .post(&url)
            .json(docs)
            .timeout(self.update_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }
        tracing::debug!(count = docs.len(), commit_within_ms, "Bulk upsert accepted");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let _permit = self.acquire().await?;

        let url = format!("{}/solr/update?commit=true", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&Vec::<Document>::new())
            .timeout(self.update_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }
        tracing::info!("Store commit forced");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // The HTTP pool holds the only session state; closing the semaphore
        // refuses any late call after the run has released the store.
        self.connections.close();
        tracing::debug!("Store session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(base_url: &str) -> StoreConfig {
        StoreConfig {
            base_url: base_url.to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_build_query_joins_terms() {
        let and = QueryRequest::new()
            .filter("author_key", "/authors/OL1A")
            .filter("type", "work");
        assert_eq!(
            SolrClient::build_query(&and),
            "author_key:\"/authors/OL1A\" AND type:\"work\""
        );

        let or = QueryRequest::new()
            .filter("author_key", "/authors/OL1A")
            .filter("author_key", "/authors/OL2A")
            .op(FilterOp::Or);
        assert_eq!(
            SolrClient::build_query(&or),
            "author_key:\"/authors/OL1A\" OR author_key:\"/authors/OL2A\""
        );

        assert_eq!(SolrClient::build_query(&QueryRequest::new()), "*:*");
    }

    #[test]
    fn test_escape_query_characters() {
        assert_eq!(SolrClient::escape(r#"a"b(c)"#), r#"a\"b\(c\)"#);
    }

    #[test]
    fn test_parse_response_with_facets() {
        let body = json!({
            "response": {
                "numFound": 12,
                "docs": [{"key": "/works/OL1W", "title": "T"}]
            },
            "facet_counts": {
                "facet_fields": {
                    "subject_facet": ["Fiction", 7, "History", 3]
                }
            }
        });
        let parsed = SolrClient::parse_response(body).unwrap();
        assert_eq!(parsed.num_found, 12);
        assert_eq!(parsed.docs.len(), 1);
        let subjects = &parsed.facets["subject_facet"];
        assert_eq!(
            subjects[0],
            FacetCount {
                value: "Fiction".to_string(),
                count: 7
            }
        );
    }

    #[tokio::test]
    async fn test_bulk_upsert_maps_validation_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/solr/update")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body("unknown field 'bogus'")
            .create_async()
            .await;

        let client = SolrClient::new(&test_config(&server.url())).unwrap();
        let doc: Document = json!({"key": "/works/OL1W", "bogus": 1})
            .as_object()
            .cloned()
            .unwrap();
        let err = client.bulk_upsert(&[doc], 60_000).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.is_retriable_per_document());
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/select")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "response": {"numFound": 1, "docs": [{"key": "/works/OL1W"}]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = SolrClient::new(&test_config(&server.url())).unwrap();
        let doc = client.get_document("/works/OL1W").await.unwrap();
        assert_eq!(
            doc.unwrap().get("key"),
            Some(&json!("/works/OL1W"))
        );
    }
}
