use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{is_truthy, remap_store_keys};
use crate::store::{DocumentStore, StoreError, StoreResult};

/// A named view of one document kind, with query parameters and an optional
/// array-zip transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub doc_type: String,
    pub name: String,
    pub params: Vec<(String, String)>,
    /// `(field, lookup)` pairs: `field` is replaced by the `lookup` values of
    /// its companion rows.
    pub transform: Vec<(String, String)>,
}

impl ViewQuery {
    pub fn new(doc_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn include_docs(self) -> Self {
        self.param("include_docs", "true")
    }

    pub fn transform(mut self, field: impl Into<String>, lookup: impl Into<String>) -> Self {
        self.transform.push((field.into(), lookup.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResult {
    pub total_rows: u64,
    pub rows: Vec<Value>,
}

pub async fn query_view<S>(store: &S, query: &ViewQuery) -> StoreResult<ViewResult>
where
    S: DocumentStore + ?Sized,
{
    debug!("querying view {}/{}", query.doc_type, query.name);
    let response = store
        .fetch_view(&query.doc_type, &query.name, &query.params)
        .await?;
    if response.status != 200 {
        return Err(StoreError::Rejected {
            status: response.status,
            body: response.body,
        });
    }

    let total_rows = response
        .body
        .get("total_rows")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::Malformed("view reply is missing `total_rows`".to_string()))?;
    let raw_rows = response
        .body
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Malformed("view reply is missing `rows`".to_string()))?;

    let rows: Vec<Value> = raw_rows.iter().map(shape_row).collect();
    if query.transform.is_empty() {
        return Ok(ViewResult { total_rows, rows });
    }

    let rows = zip_transform(&rows, &query.transform);
    Ok(ViewResult {
        total_rows: rows.len() as u64,
        rows,
    })
}

/// Turns a raw view row into its caller-facing value.
///
/// A row whose value links another document (`value._id` set and `doc`
/// included) gets that document embedded under the document's `type`.
/// Otherwise the value's own store keys are remapped to `id`/`rev`.
pub fn shape_row(row: &Value) -> Value {
    let mut value = row.get("value").cloned().unwrap_or(Value::Null);
    let Some(fields) = value.as_object_mut() else {
        return value;
    };

    let linked_doc = row
        .get("doc")
        .filter(|doc| is_truthy(doc))
        .filter(|_| fields.get("_id").map(is_truthy).unwrap_or(false));

    match linked_doc {
        Some(doc) => {
            if let (Some(doc_type), Value::Object(doc_fields)) =
                (doc.get("type").and_then(Value::as_str), doc)
            {
                let mut embedded = doc_fields.clone();
                remap_store_keys(&mut embedded);
                fields.insert(doc_type.to_string(), Value::Object(embedded));
            }
            fields.remove("_id");
            if let Some(rev) = fields.remove("_rev") {
                fields.insert("rev".to_string(), rev);
            }
        }
        None => {
            // An unresolved link leaves `_id` pointing at the linked record;
            // it must not replace the row's own id.
            if fields.contains_key("id") {
                fields.remove("_id");
            }
            remap_store_keys(fields)
        }
    }
    value
}

/// Collapses companion rows into their parent row.
///
/// For each row and each `(field, lookup)` pair whose field is set, the `n`
/// rows right before it (where `n` is the field's length) supply the
/// replacement values, read from their `lookup` key. Rows that matched no
/// pair are dropped. Correctness relies entirely on the view emitting
/// companion rows contiguously and in order.
pub fn zip_transform(rows: &[Value], transform: &[(String, String)]) -> Vec<Value> {
    let mut output = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut current = row.clone();
        let mut matched = false;
        if let Some(fields) = current.as_object_mut() {
            for (field, lookup) in transform {
                let Some(references) = fields.get(field).filter(|v| is_truthy(v)) else {
                    continue;
                };
                let window = companion_window(rows.len(), index, reference_count(references));
                let joined = rows[window]
                    .iter()
                    .map(|companion| companion.get(lookup).cloned().unwrap_or(Value::Null))
                    .collect();
                fields.insert(field.clone(), Value::Array(joined));
                matched = true;
            }
        }
        if matched {
            output.push(current);
        }
    }
    output
}

/// Length of a reference field: array items, or UTF-16 units for a string.
/// Other values have no length.
fn reference_count(references: &Value) -> Option<usize> {
    match references {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.encode_utf16().count()),
        _ => None,
    }
}

/// Rows `[index - count, index)` with slice semantics: a negative start
/// counts back from the end of `rows`, an empty range yields nothing, and a
/// missing count starts from the first row.
fn companion_window(len: usize, index: usize, count: Option<usize>) -> std::ops::Range<usize> {
    let start = match count {
        Some(count) if count <= index => index - count,
        Some(count) => (len + index).saturating_sub(count),
        None => 0,
    };
    if start < index {
        start..index
    } else {
        index..index
    }
}
