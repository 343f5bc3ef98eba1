use serde_json::Value;

use crate::store::error::StoreResult;

/// Raw reply from the document store: HTTP status plus decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: Value,
}

impl StoreResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Wire operations the document layer needs from a store.
///
/// Implementations report transport failures as errors and hand every
/// answered request back as a `StoreResponse`, whatever its status; status
/// interpretation belongs to the caller.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// `GET /{id}`
    async fn fetch_document(&self, id: &str) -> StoreResult<StoreResponse>;
    /// `PUT /{id}` with a JSON body.
    async fn put_document(&self, id: &str, body: &Value) -> StoreResult<StoreResponse>;
    /// `GET /_design/{design}/_view/{view}` with query parameters.
    async fn fetch_view(
        &self,
        design: &str,
        view: &str,
        params: &[(String, String)],
    ) -> StoreResult<StoreResponse>;
}

