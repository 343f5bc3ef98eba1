mod common;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{connected_store, MemoryStore};
use cv_backend::model::{is_date, Company, Document, Entity, Project, Record, Skill, Tool};
use cv_backend::store::StoreError;
use cv_backend::{ViewQuery, ViewResult};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

async fn created<E: Entity>(store: &MemoryStore, fields: Value) -> E {
    let mut entity = E::from(Document::new(E::SPEC, record(fields)));
    entity.create(store).await.unwrap();
    entity
}

#[tokio::test]
async fn test_create_assigns_id_and_rev() {
    let store = MemoryStore::new();
    let company: Company = created(&store, json!({"name": "Unosquare"})).await;

    let id = company.id().unwrap();
    assert!(!id.is_empty());
    assert!(company.rev().unwrap().starts_with("1-"));
    assert!(is_date(company.get("createdOn").unwrap()));

    let raw = store.raw(id).unwrap();
    assert_eq!(raw["type"], "company");
    assert_eq!(raw["name"], "Unosquare");
}

#[tokio::test]
async fn test_invalid_field_reports_single_error_and_keeps_id_unset() {
    let store = MemoryStore::new();
    let mut tool = Tool::new(record(json!({"name": ["not", "a", "string"], "url": "nope"})));

    let validation = tool.validate_doc();
    assert_eq!(validation.errors.len(), 2);

    let err = tool.create(&store).await.unwrap_err();
    assert_eq!(err.code(), "InvalidType");
    assert_eq!(err.to_string(), "Property name must be string");
    assert!(tool.id().is_none());
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_update_keeps_id_and_advances_rev() {
    let store = MemoryStore::new();
    let mut skill: Skill = created(&store, json!({"name": "rust"})).await;
    let id = skill.id().unwrap().to_string();
    let first_rev = skill.rev().unwrap().to_string();

    skill.set("url", "https://www.rust-lang.org/");
    skill.update(&store).await.unwrap();

    assert_eq!(skill.id(), Some(id.as_str()));
    assert_ne!(skill.rev(), Some(first_rev.as_str()));
    assert!(skill.rev().unwrap().starts_with("2-"));
    assert!(is_date(skill.get("updatedOn").unwrap()));
}

#[tokio::test]
async fn test_update_without_id_touches_nothing() {
    let store = MemoryStore::new();
    let mut skill = Skill::new(record(json!({"name": "rust"})));

    skill.update(&store).await.unwrap();
    skill.remove(&store).await.unwrap();

    assert_eq!(store.put_count(), 0);
    assert!(skill.id().is_none());
    assert!(skill.rev().is_none());
}

#[tokio::test]
async fn test_stale_revision_is_rejected() {
    let store = MemoryStore::new();
    let mut first: Company = created(&store, json!({"name": "Acme"})).await;
    let mut second = Company::find_by_id(&store, first.id().unwrap())
        .await
        .unwrap()
        .unwrap();

    first.set("name", "Acme Inc");
    first.update(&store).await.unwrap();

    second.set("name", "Acme Corp");
    let stale_rev = second.rev().map(str::to_string);
    let err = second.update(&store).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(second.rev().map(str::to_string), stale_rev);
}

#[tokio::test]
async fn test_remove_is_a_soft_delete() {
    let store = MemoryStore::new();
    let mut company: Company = created(&store, json!({"name": "Gone"})).await;
    let id = company.id().unwrap().to_string();

    company.remove(&store).await.unwrap();

    let found = Company::find_by_id(&store, &id).await.unwrap().unwrap();
    assert!(is_date(found.get("removedOn").unwrap()));
    let listed = Company::get_all(&store).await.unwrap();
    assert_eq!(listed.total_rows, 0);
}

#[tokio::test]
async fn test_get_by_id_for_missing_record_is_none() {
    let store = MemoryStore::new();
    let found = Document::get_by_id(&store, "does-not-exist").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_get_by_id_remaps_store_keys() {
    let store = MemoryStore::new();
    let company: Company = created(&store, json!({"name": "Unosquare"})).await;
    let id = company.id().unwrap();

    let found = Document::get_by_id(&store, id).await.unwrap().unwrap();
    assert_eq!(found["id"], id);
    assert_eq!(found["rev"], company.rev().unwrap());
    assert!(!found.contains_key("_id"));
    assert!(!found.contains_key("_rev"));
}

#[tokio::test]
async fn test_view_without_transform_keeps_rows() {
    let store = MemoryStore::new();
    let skill: Skill = created(&store, json!({"name": "rust"})).await;
    created::<Skill>(&store, json!({"name": "d3"})).await;
    let mut project = Project::with_defaults(record(json!({"name": "CV"})));
    project.add_skill(&skill);
    project.create(&store).await.unwrap();

    let result = Document::query_view(&store, &ViewQuery::new("project", "all"))
        .await
        .unwrap();
    assert_eq!(result.rows.len() as u64, result.total_rows);
    assert_eq!(result.rows[0]["skills"], json!([skill.id().unwrap()]));
    assert!(result.rows[0].get("_id").is_none());

    let skills = Skill::get_all(&store).await.unwrap();
    assert_eq!(skills.total_rows, 2);
}

#[tokio::test]
async fn test_valid_projects_embed_company_and_skills() {
    let store = MemoryStore::new();
    let company: Company = created(&store, json!({"name": "Unosquare"})).await;
    let nodejs: Skill = created(&store, json!({"name": "nodejs"})).await;
    let d3: Skill = created(&store, json!({"name": "d3"})).await;

    let mut project = Project::with_defaults(record(json!({"name": "Bluejay"})));
    project.assign_company(&company).add_skill(&nodejs).add_skill(&d3);
    project.create(&store).await.unwrap();

    let result = Project::get_all_valid(&store).await.unwrap();
    assert_eq!(result.total_rows, 1);
    let row = &result.rows[0];
    assert_eq!(row["id"], project.id().unwrap());
    assert_eq!(row["company"], Value::Object(company.to_record()));
    assert_eq!(
        row["skills"],
        json!([nodejs.to_record(), d3.to_record()])
    );
}

#[tokio::test]
async fn test_failed_put_leaves_document_unsaved() {
    let server = MockServer::start().await;
    let store = connected_store(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/cv/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict",
            "reason": "Document update conflict.",
        })))
        .mount(&server)
        .await;

    let mut company = Company::new(record(json!({"name": "Acme"})));
    let err = company.create(&store).await.unwrap_err();

    match err {
        StoreError::Rejected { status, body } => {
            assert_eq!(status, 409);
            assert_eq!(body["error"], "conflict");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(company.id().is_none());
    assert!(company.rev().is_none());
}

#[tokio::test]
async fn test_save_sends_type_and_generated_id() {
    let server = MockServer::start().await;
    let store = connected_store(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/cv/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "assigned",
            "rev": "1-abc",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut skill = Skill::new(record(json!({"name": "rust", "url": ""})));
    skill.create(&store).await.unwrap();
    assert_eq!(skill.id(), Some("assigned"));
    assert_eq!(skill.rev(), Some("1-abc"));

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["type"], "skill");
    assert_eq!(body["name"], "rust");
    assert!(body.get("url").is_none());
    assert!(body.get("_rev").is_none());
    assert_eq!(
        put.url.path().trim_start_matches("/cv/"),
        body["_id"].as_str().unwrap()
    );
}

#[tokio::test]
async fn test_view_query_over_http_applies_transform() {
    let server = MockServer::start().await;
    let store = connected_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/cv/_design/project/_view/allValid"))
        .and(query_param("include_docs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 5,
            "offset": 0,
            "rows": [
                {"value": {"_id": "s1"}, "doc": {"_id": "s1", "_rev": "1-a", "type": "skill", "name": "nodejs"}},
                {"value": {"id": "p1", "rev": "1-p", "skills": ["s1"]}, "doc": {"_id": "p1", "type": "project"}},
                {"value": {"_id": "s2"}, "doc": {"_id": "s2", "_rev": "1-b", "type": "skill", "name": "d3"}},
                {"value": {"_id": "s3"}, "doc": {"_id": "s3", "_rev": "1-c", "type": "skill", "name": "rust"}},
                {"value": {"id": "p2", "rev": "1-q", "skills": ["s2", "s3"]}, "doc": {"_id": "p2", "type": "project"}}
            ]
        })))
        .mount(&server)
        .await;

    let result: ViewResult = Project::get_all_valid(&store).await.unwrap();

    assert_eq!(result.total_rows, 2);
    assert_eq!(result.rows.len(), 2);
    let names = |row: &Value| -> Vec<String> {
        row["skills"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(names(&result.rows[0]), vec!["nodejs"]);
    assert_eq!(names(&result.rows[1]), vec!["d3", "rust"]);
    assert_eq!(result.rows[1]["skills"][0]["id"], "s2");
}

#[tokio::test]
async fn test_view_error_passes_store_body_through() {
    let server = MockServer::start().await;
    let store = connected_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/cv/_design/company/_view/all"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing_named_view",
        })))
        .mount(&server)
        .await;

    let err = Company::get_all(&store).await.unwrap_err();
    match err {
        StoreError::Rejected { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body["reason"], "missing_named_view");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_find_by_id_ignores_records_of_another_kind() {
    let store = MemoryStore::new();
    let skill: Skill = created(&store, json!({"name": "rust"})).await;
    let id = skill.id().unwrap();

    assert!(Company::find_by_id(&store, id).await.unwrap().is_none());
    assert!(Skill::find_by_id(&store, id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_document_ids_are_sent_as_one_path_segment() {
    let server = MockServer::start().await;
    let store = connected_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/cv/_design%2Fcompany"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = Document::get_by_id(&store, "_design/company").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_valid_projects_with_dangling_company_keep_their_id() {
    let store = MemoryStore::new();
    let mut project = Project::with_defaults(record(json!({"name": "Bluejay", "company": "ghost"})));
    project.create(&store).await.unwrap();

    let result = Project::get_all_valid(&store).await.unwrap();
    assert_eq!(result.total_rows, 1);
    assert_eq!(result.rows[0]["id"], project.id().unwrap());
    assert_eq!(result.rows[0]["company"], "ghost");
}
