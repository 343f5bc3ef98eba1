use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Json as RequestJson,
};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::model::{
    find_entity, list_entities as list_kind, Company, Document, Entity, Id, Project, Record, Role,
    Skill, Tool,
};
use crate::store::{DocumentStore, StoreError};

pub type AppState<S> = Arc<S>;

/// Response body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub code: u16,
    pub status: String,
    pub message: Option<Value>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn new(code: StatusCode, message: Option<Value>, data: Option<T>) -> Self {
        Self {
            code: code.as_u16(),
            status: status_label(code).to_string(),
            message,
            data,
        }
    }
}

/// `fail` for server errors, `error` for client errors, `success` otherwise.
pub fn status_label(code: StatusCode) -> &'static str {
    if code.is_server_error() {
        "fail"
    } else if code.is_client_error() {
        "error"
    } else {
        "success"
    }
}

pub type ApiError = (StatusCode, Json<Envelope>);
pub type ApiResult = Result<Response, ApiError>;

fn respond<T: Serialize>(code: StatusCode, data: T) -> Response {
    (code, Json(Envelope::new(code, None, Some(data)))).into_response()
}

fn not_found(label: &str) -> ApiError {
    let code = StatusCode::NOT_FOUND;
    (
        code,
        Json(Envelope::new(
            code,
            None,
            Some(Value::from(format!("{} resource not found", label))),
        )),
    )
}

fn store_failure(err: StoreError) -> ApiError {
    if err.is_invalid_type() {
        let code = StatusCode::BAD_REQUEST;
        let message = json!({"code": err.code(), "message": err.to_string()});
        return (code, Json(Envelope::new(code, Some(message), None)));
    }
    error!("document store operation failed: {}", err);
    let code = StatusCode::INTERNAL_SERVER_ERROR;
    (
        code,
        Json(Envelope::new(code, Some(Value::from(err.to_string())), None)),
    )
}

async fn find_or_404<E, S>(store: &S, id: &str) -> Result<E, ApiError>
where
    E: Entity,
    S: DocumentStore + ?Sized,
{
    match find_entity::<E, S>(store, id).await {
        Ok(Some(entity)) => Ok(entity),
        Ok(None) => Err(not_found(E::LABEL)),
        Err(e) => Err(store_failure(e)),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Option<Id>,
    pub rev: Option<String>,
}

impl CreatedResponse {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id().map(str::to_string),
            rev: doc.rev().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLink {
    pub company_id: Id,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLink {
    pub skill_id: Id,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleLink {
    pub role_id: Id,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLink {
    pub tool_id: Id,
}

// Generic entity endpoints

pub async fn list_entities<S: DocumentStore, E: Entity>(
    State(store): State<AppState<S>>,
) -> ApiResult {
    match list_kind::<E, S>(store.as_ref()).await {
        Ok(result) => Ok(respond(StatusCode::OK, result)),
        Err(e) => Err(store_failure(e)),
    }
}

pub async fn create_entity<S: DocumentStore, E: Entity>(
    State(store): State<AppState<S>>,
    RequestJson(body): RequestJson<Record>,
) -> ApiResult {
    let mut entity = E::from(Document::new(E::SPEC, body));
    entity.create(store.as_ref()).await.map_err(store_failure)?;
    Ok(respond(
        StatusCode::CREATED,
        CreatedResponse::from_document(&entity),
    ))
}

pub async fn get_entity<S: DocumentStore, E: Entity>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult {
    let entity = find_or_404::<E, S>(store.as_ref(), &id).await?;
    Ok(respond(StatusCode::OK, entity.to_record()))
}

pub async fn update_entity<S: DocumentStore, E: Entity>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(body): RequestJson<Record>,
) -> ApiResult {
    let mut entity = find_or_404::<E, S>(store.as_ref(), &id).await?;
    entity.merge(body);
    entity.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Soft removal: the record is timestamped, not deleted.
pub async fn delete_entity<S: DocumentStore, E: Entity>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult {
    let mut entity = find_or_404::<E, S>(store.as_ref(), &id).await?;
    entity.remove(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// Project endpoints

pub async fn list_projects<S: DocumentStore>(State(store): State<AppState<S>>) -> ApiResult {
    match Project::get_all_valid(store.as_ref()).await {
        Ok(result) => Ok(respond(StatusCode::OK, result)),
        Err(e) => Err(store_failure(e)),
    }
}

pub async fn create_project<S: DocumentStore>(
    State(store): State<AppState<S>>,
    RequestJson(body): RequestJson<Record>,
) -> ApiResult {
    let mut project = Project::with_defaults(body);
    project.create(store.as_ref()).await.map_err(store_failure)?;
    Ok(respond(
        StatusCode::CREATED,
        CreatedResponse::from_document(&project),
    ))
}

pub async fn assign_project_company<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(link): RequestJson<CompanyLink>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let company = find_or_404::<Company, S>(store.as_ref(), &link.company_id).await?;
    project.assign_company(&company);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn add_project_skill<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(link): RequestJson<SkillLink>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let skill = find_or_404::<Skill, S>(store.as_ref(), &link.skill_id).await?;
    project.add_skill(&skill);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::CREATED.into_response())
}

pub async fn list_project_roles<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult {
    let project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let roles = linked_records::<Role, S>(store.as_ref(), &project, "roles").await?;
    Ok(respond(StatusCode::OK, roles))
}

pub async fn add_project_role<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(link): RequestJson<RoleLink>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let role = find_or_404::<Role, S>(store.as_ref(), &link.role_id).await?;
    project.add_role(&role);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::CREATED.into_response())
}

pub async fn remove_project_role<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path((id, role_id)): Path<(Id, Id)>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    project.remove_role(&role_id);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn list_project_tools<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult {
    let project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let tools = linked_records::<Tool, S>(store.as_ref(), &project, "tools").await?;
    Ok(respond(StatusCode::OK, tools))
}

pub async fn add_project_tool<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(link): RequestJson<ToolLink>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    let tool = find_or_404::<Tool, S>(store.as_ref(), &link.tool_id).await?;
    project.add_tool(&tool);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::CREATED.into_response())
}

pub async fn remove_project_tool<S: DocumentStore>(
    State(store): State<AppState<S>>,
    Path((id, tool_id)): Path<(Id, Id)>,
) -> ApiResult {
    let mut project = find_or_404::<Project, S>(store.as_ref(), &id).await?;
    project.remove_tool(&tool_id);
    project.update(store.as_ref()).await.map_err(store_failure)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Records referenced by one of the project's id lists. Ids that no longer
/// resolve are skipped.
async fn linked_records<E, S>(
    store: &S,
    project: &Project,
    list: &str,
) -> Result<Vec<Record>, ApiError>
where
    E: Entity,
    S: DocumentStore + ?Sized,
{
    let mut records = Vec::new();
    for id in project.reference_ids(list) {
        match find_entity::<E, S>(store, &id).await {
            Ok(Some(entity)) => records.push(entity.to_record()),
            Ok(None) => {}
            Err(e) => return Err(store_failure(e)),
        }
    }
    Ok(records)
}
