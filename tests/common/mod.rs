#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cv_backend::config::CouchConfig;
use cv_backend::store::{Connection, CouchStore, DocumentStore, StoreResponse, StoreResult};

/// CouchDB settings pointing at a mock server.
pub fn couch_config(server: &MockServer) -> CouchConfig {
    let address = server.address();
    CouchConfig {
        host: address.ip().to_string(),
        port: address.port(),
        provision: false,
        ..CouchConfig::default()
    }
}

/// Mounts the database probe reply for `cv`.
pub async fn mount_database(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "db_name": "cv",
            "doc_count": 0,
        })))
        .mount(server)
        .await;
}

/// A `CouchStore` already connected to the mock server.
pub async fn connected_store(server: &MockServer) -> CouchStore {
    mount_database(server).await;
    let connection = Arc::new(Connection::new(couch_config(server)));
    connection.establish().await.unwrap();
    CouchStore::new(connection)
}

/// In-memory stand-in for a CouchDB database.
///
/// Revisions are checked on write the way CouchDB does it, and the `all`
/// and `allValid` views of the bundled design documents are evaluated in
/// Rust.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn raw(&self, id: &str) -> Option<Value> {
        self.docs.lock().get(id).cloned()
    }

    fn all_rows(&self, doc_type: &str) -> Vec<Value> {
        self.docs
            .lock()
            .values()
            .filter(|doc| doc["type"] == doc_type && doc.get("removedOn").is_none())
            .map(|doc| json!({"id": doc["_id"], "key": doc["_id"], "value": doc}))
            .collect()
    }

    fn valid_project_rows(&self, include_docs: bool) -> Vec<Value> {
        let docs = self.docs.lock();
        let linked = |id: &Value| -> Value {
            id.as_str()
                .and_then(|id| docs.get(id).cloned())
                .unwrap_or(Value::Null)
        };

        let mut rows = Vec::new();
        for doc in docs.values() {
            if doc["type"] != "project" || doc.get("removedOn").is_some() {
                continue;
            }
            let skills = doc
                .get("skills")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for (i, skill) in skills.iter().enumerate() {
                let mut row = json!({
                    "id": doc["_id"],
                    "key": [doc["_id"], 0, i],
                    "value": {"_id": skill},
                });
                if include_docs {
                    row["doc"] = linked(skill);
                }
                rows.push(row);
            }

            let mut value: Map<String, Value> = doc
                .as_object()
                .map(|fields| {
                    fields
                        .iter()
                        .filter(|(key, _)| *key != "_id" && *key != "_rev")
                        .map(|(key, v)| (key.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            value.insert("id".to_string(), doc["_id"].clone());
            value.insert("rev".to_string(), doc["_rev"].clone());
            value.insert("skills".to_string(), Value::Array(skills));
            let company = doc.get("company").filter(|c| c.is_string()).cloned();
            if let Some(company) = &company {
                value.insert("_id".to_string(), company.clone());
            }

            let mut row = json!({
                "id": doc["_id"],
                "key": [doc["_id"], 1],
                "value": Value::Object(value),
            });
            if include_docs {
                row["doc"] = match &company {
                    Some(company) => linked(company),
                    None => doc.clone(),
                };
            }
            rows.push(row);
        }
        rows
    }
}

fn next_rev(current: Option<&str>) -> String {
    let generation = current
        .and_then(|rev| rev.split('-').next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);
    format!("{}-{}", generation + 1, uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_document(&self, id: &str) -> StoreResult<StoreResponse> {
        Ok(match self.docs.lock().get(id) {
            Some(doc) => StoreResponse::new(200, doc.clone()),
            None => StoreResponse::new(404, json!({"error": "not_found", "reason": "missing"})),
        })
    }

    async fn put_document(&self, id: &str, body: &Value) -> StoreResult<StoreResponse> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock();
        let current = docs
            .get(id)
            .and_then(|doc| doc.get("_rev"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let incoming = body.get("_rev").and_then(Value::as_str);
        if current.as_deref() != incoming {
            return Ok(StoreResponse::new(
                409,
                json!({"error": "conflict", "reason": "Document update conflict."}),
            ));
        }

        let rev = next_rev(current.as_deref());
        let mut doc = body.clone();
        doc["_id"] = Value::from(id);
        doc["_rev"] = Value::from(rev.clone());
        docs.insert(id.to_string(), doc);
        Ok(StoreResponse::new(
            201,
            json!({"ok": true, "id": id, "rev": rev}),
        ))
    }

    async fn fetch_view(
        &self,
        design: &str,
        view: &str,
        params: &[(String, String)],
    ) -> StoreResult<StoreResponse> {
        let include_docs = params
            .iter()
            .any(|(key, value)| key == "include_docs" && value == "true");
        let rows = match (design, view) {
            (_, "all") => self.all_rows(design),
            ("project", "allValid") => self.valid_project_rows(include_docs),
            _ => {
                return Ok(StoreResponse::new(
                    404,
                    json!({"error": "not_found", "reason": "missing_named_view"}),
                ))
            }
        };
        Ok(StoreResponse::new(
            200,
            json!({"total_rows": rows.len(), "offset": 0, "rows": rows}),
        ))
    }
}
