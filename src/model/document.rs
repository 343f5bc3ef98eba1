use log::debug;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::logic::view::{self, ViewQuery, ViewResult};
use crate::model::{
    current_timestamp, generate_id, is_truthy, remap_store_keys, EntitySpec, FieldType, Id, Record,
};
use crate::store::{DocumentStore, StoreError, StoreResult};

/// Keys owned by the document itself rather than by its field map.
const RESERVED_KEYS: [&str; 3] = ["id", "rev", "type"];

/// One field that failed its type predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub expected: FieldType,
}

impl FieldError {
    pub fn code(&self) -> &'static str {
        "InvalidType"
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property {} must be {}", self.field, self.expected)
    }
}

impl From<FieldError> for StoreError {
    fn from(err: FieldError) -> Self {
        StoreError::InvalidType {
            field: err.field,
            expected: err.expected,
        }
    }
}

/// Outcome of checking a document against its spec.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub errors: Vec<FieldError>,
    /// Fields that are set and passed their predicate.
    pub data: Record,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A typed record persisted in the document store.
///
/// `id` is assigned on the first successful save and `rev` follows every
/// successful save. Both are left untouched when a save fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    spec: &'static EntitySpec,
    id: Option<Id>,
    rev: Option<String>,
    fields: Record,
}

impl Document {
    /// A fresh, unsaved document. Any `id`, `rev` or `type` keys in `fields`
    /// are discarded.
    pub fn new(spec: &'static EntitySpec, mut fields: Record) -> Self {
        for key in RESERVED_KEYS {
            fields.remove(key);
        }
        Self {
            spec,
            id: None,
            rev: None,
            fields,
        }
    }

    /// Rebuilds a document from a record read back from the store, keeping
    /// its `id` and `rev`.
    pub fn from_record(spec: &'static EntitySpec, mut record: Record) -> Self {
        remap_store_keys(&mut record);
        let id = take_string(&mut record, "id");
        let rev = take_string(&mut record, "rev");
        record.remove("type");
        Self {
            spec,
            id,
            rev,
            fields: record,
        }
    }

    pub fn spec(&self) -> &'static EntitySpec {
        self.spec
    }

    pub fn doc_type(&self) -> &'static str {
        self.spec.doc_type
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Overlays `changes` onto the field map, ignoring `id`, `rev` and `type`.
    pub fn merge(&mut self, changes: Record) -> &mut Self {
        for (key, value) in changes {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                self.fields.insert(key, value);
            }
        }
        self
    }

    /// Array field as a mutable vector, created empty when missing or not an array.
    pub fn array_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let slot = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("slot was just replaced with an array"),
        }
    }

    /// Checks every truthy spec field against its predicate. Falsy or absent
    /// fields are skipped, neither validated nor included.
    pub fn validate_doc(&self) -> Validation {
        let mut validation = Validation::default();
        for field in self.spec.fields() {
            let Some(value) = self.fields.get(field.name) else {
                continue;
            };
            if !is_truthy(value) {
                continue;
            }
            if field.field_type.matches(value) {
                validation.data.insert(field.name.to_string(), value.clone());
            } else {
                validation.errors.push(FieldError {
                    field: field.name.to_string(),
                    expected: field.field_type,
                });
            }
        }
        validation
    }

    /// Validates and upserts the document. Only the first validation error
    /// is reported.
    pub async fn save<S>(&mut self, store: &S) -> StoreResult<()>
    where
        S: DocumentStore + ?Sized,
    {
        let validation = self.validate_doc();
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error.into());
        }

        let id = self.id.clone().unwrap_or_else(generate_id);
        let mut body = validation.data;
        body.insert("type".to_string(), Value::from(self.spec.doc_type));
        if let Some(rev) = &self.rev {
            body.insert("_rev".to_string(), Value::from(rev.clone()));
        }
        body.insert("_id".to_string(), Value::from(id.clone()));

        debug!("saving {} document {}", self.spec.doc_type, id);
        let response = store.put_document(&id, &Value::Object(body)).await?;
        if response.status != 201 {
            return Err(StoreError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let saved_id = response
            .body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("save reply is missing `id`".to_string()))?;
        let saved_rev = response
            .body
            .get("rev")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("save reply is missing `rev`".to_string()))?;
        self.id = Some(saved_id.to_string());
        self.rev = Some(saved_rev.to_string());
        Ok(())
    }

    pub async fn create<S>(&mut self, store: &S) -> StoreResult<()>
    where
        S: DocumentStore + ?Sized,
    {
        self.set("createdOn", current_timestamp());
        self.save(store).await
    }

    /// Stamps `updatedOn` and saves. A document that was never created is
    /// left alone and the call succeeds without touching the store.
    pub async fn update<S>(&mut self, store: &S) -> StoreResult<()>
    where
        S: DocumentStore + ?Sized,
    {
        self.set("updatedOn", current_timestamp());
        if self.id.is_none() {
            return Ok(());
        }
        self.save(store).await
    }

    /// Stamps `removedOn` and saves. The record stays in the store.
    pub async fn remove<S>(&mut self, store: &S) -> StoreResult<()>
    where
        S: DocumentStore + ?Sized,
    {
        self.set("removedOn", current_timestamp());
        if self.id.is_none() {
            return Ok(());
        }
        self.save(store).await
    }

    /// Fetches a raw record by id. A missing record is `Ok(None)`.
    pub async fn get_by_id<S>(store: &S, id: &str) -> StoreResult<Option<Record>>
    where
        S: DocumentStore + ?Sized,
    {
        let response = store.fetch_document(id).await?;
        match response.status {
            404 => Ok(None),
            200 => match response.body {
                Value::Object(mut record) => {
                    remap_store_keys(&mut record);
                    Ok(Some(record))
                }
                other => Err(StoreError::Malformed(format!(
                    "document {} is not an object: {}",
                    id, other
                ))),
            },
            status => Err(StoreError::Rejected {
                status,
                body: response.body,
            }),
        }
    }

    /// `get_by_id` wrapped into a document of the given kind. A record of
    /// another kind counts as missing.
    pub async fn find_by_id<S>(
        spec: &'static EntitySpec,
        store: &S,
        id: &str,
    ) -> StoreResult<Option<Document>>
    where
        S: DocumentStore + ?Sized,
    {
        let record = Self::get_by_id(store, id).await?;
        Ok(record
            .filter(|record| record.get("type").and_then(Value::as_str) == Some(spec.doc_type))
            .map(|record| Document::from_record(spec, record)))
    }

    pub async fn query_view<S>(store: &S, query: &ViewQuery) -> StoreResult<ViewResult>
    where
        S: DocumentStore + ?Sized,
    {
        view::query_view(store, query).await
    }

    /// Caller-facing record: fields plus `id`, `rev` and `type`.
    pub fn to_record(&self) -> Record {
        let mut record = self.fields.clone();
        if let Some(id) = &self.id {
            record.insert("id".to_string(), Value::from(id.clone()));
        }
        if let Some(rev) = &self.rev {
            record.insert("rev".to_string(), Value::from(rev.clone()));
        }
        record.insert("type".to_string(), Value::from(self.spec.doc_type));
        record
    }
}

impl Serialize for Document {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.to_record().serialize(serializer)
    }
}

fn take_string(record: &mut Record, key: &str) -> Option<String> {
    match record.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
