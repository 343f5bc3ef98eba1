use anyhow::Context;
use log::{debug, info};
use reqwest::{Method, Url};
use serde_json::Value;
use std::sync::Arc;

use crate::store::connection::read_response;
use crate::store::traits::{DocumentStore, StoreResponse};
use crate::store::{Connection, StoreError, StoreResult};

/// Design documents shipped with the crate, keyed by document type.
pub const BUNDLED_DESIGNS: [(&str, &str); 6] = [
    ("company", include_str!("../../design/company.json")),
    ("project", include_str!("../../design/project.json")),
    ("skill", include_str!("../../design/skill.json")),
    ("location", include_str!("../../design/location.json")),
    ("role", include_str!("../../design/role.json")),
    ("tool", include_str!("../../design/tool.json")),
];

/// `DocumentStore` backed by a CouchDB database over HTTP.
#[derive(Debug, Clone)]
pub struct CouchStore {
    connection: Arc<Connection>,
}

impl CouchStore {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn base_url(&self) -> StoreResult<String> {
        self.connection
            .connection_url()
            .ok_or(StoreError::NotConnected)
    }

    /// Database URL extended by `segments`, each percent-encoded as a single
    /// path segment.
    fn url_for(&self, segments: &[&str]) -> StoreResult<Url> {
        let base = self.base_url()?;
        let mut url = Url::parse(&base)
            .map_err(|e| StoreError::Malformed(format!("bad store url {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed(format!("store url {} cannot take a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        params: &[(String, String)],
    ) -> StoreResult<StoreResponse> {
        debug!("{} {}", method, url);
        let mut request = self.connection.request(method, url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        read_response(response).await
    }

    /// Creates the configured database. An existing database counts as success.
    pub async fn create_database(&self) -> StoreResult<()> {
        let url = self.connection.config().database_url();
        let reply = self.send(Method::PUT, &url, None, &[]).await?;
        let exists = reply.body.get("error").and_then(Value::as_str) == Some("file_exists");
        if (200..300).contains(&reply.status) || exists {
            info!("database {} ready", self.connection.config().db);
            return Ok(());
        }
        Err(StoreError::Rejected {
            status: reply.status,
            body: reply.body,
        })
    }

    /// Drops the configured database. Only transport failures are errors.
    pub async fn remove_database(&self) -> StoreResult<()> {
        let url = self.connection.config().database_url();
        self.send(Method::DELETE, &url, None, &[]).await?;
        Ok(())
    }

    /// Writes `_design/{doc_type}`, replacing the current revision if any.
    pub async fn save_design(&self, doc_type: &str, design: &Value) -> StoreResult<()> {
        let id = format!("_design/{}", doc_type);
        let url = self.url_for(&["_design", doc_type])?;
        let url = url.as_str();

        let mut body = design.clone();
        let current = self.send(Method::GET, url, None, &[]).await?;
        if let (Some(fields), Some(rev)) = (body.as_object_mut(), current.body.get("_rev")) {
            if current.status == 200 {
                fields.insert("_rev".to_string(), rev.clone());
            }
        }

        let reply = self.send(Method::PUT, url, Some(&body), &[]).await?;
        if !(200..300).contains(&reply.status) {
            return Err(StoreError::Rejected {
                status: reply.status,
                body: reply.body,
            });
        }
        info!("saved design document {}", id);
        Ok(())
    }

    /// Saves every bundled design document.
    pub async fn install_designs(&self) -> anyhow::Result<()> {
        for (doc_type, source) in BUNDLED_DESIGNS {
            let design: Value = serde_json::from_str(source)
                .with_context(|| format!("bundled design for {} is not valid JSON", doc_type))?;
            self.save_design(doc_type, &design)
                .await
                .with_context(|| format!("Failed to save design document for {}", doc_type))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for CouchStore {
    async fn fetch_document(&self, id: &str) -> StoreResult<StoreResponse> {
        let url = self.url_for(&[id])?;
        self.send(Method::GET, url.as_str(), None, &[]).await
    }

    async fn put_document(&self, id: &str, body: &Value) -> StoreResult<StoreResponse> {
        let url = self.url_for(&[id])?;
        self.send(Method::PUT, url.as_str(), Some(body), &[]).await
    }

    async fn fetch_view(
        &self,
        design: &str,
        view: &str,
        params: &[(String, String)],
    ) -> StoreResult<StoreResponse> {
        let url = self.url_for(&["_design", design, "_view", view])?;
        self.send(Method::GET, url.as_str(), None, params).await
    }
}
