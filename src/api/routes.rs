use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::model::{Company, Entity, Location, Project, Role, Skill, Tool};
use crate::store::DocumentStore;

pub fn create_router<S: DocumentStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Plain entity collections
        .merge(entity_routes::<S, Company>("/companies"))
        .merge(entity_routes::<S, Skill>("/skills"))
        .merge(entity_routes::<S, Location>("/locations"))
        .merge(entity_routes::<S, Role>("/roles"))
        .merge(entity_routes::<S, Tool>("/tools"))
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects::<S>).post(handlers::create_project::<S>),
        )
        .route(
            "/projects/:id",
            get(handlers::get_entity::<S, Project>)
                .put(handlers::update_entity::<S, Project>)
                .delete(handlers::delete_entity::<S, Project>),
        )
        .route(
            "/projects/:id/company",
            put(handlers::assign_project_company::<S>),
        )
        .route("/projects/:id/skills", post(handlers::add_project_skill::<S>))
        .route(
            "/projects/:id/roles",
            get(handlers::list_project_roles::<S>).post(handlers::add_project_role::<S>),
        )
        .route(
            "/projects/:id/roles/:role_id",
            delete(handlers::remove_project_role::<S>),
        )
        .route(
            "/projects/:id/tools",
            get(handlers::list_project_tools::<S>).post(handlers::add_project_tool::<S>),
        )
        .route(
            "/projects/:id/tools/:tool_id",
            delete(handlers::remove_project_tool::<S>),
        )
}

/// List/create on `base`, read/update/remove on `base/:id`.
fn entity_routes<S: DocumentStore + 'static, E: Entity>(base: &str) -> Router<Arc<S>> {
    Router::new()
        .route(
            base,
            get(handlers::list_entities::<S, E>).post(handlers::create_entity::<S, E>),
        )
        .route(
            &format!("{}/:id", base),
            get(handlers::get_entity::<S, E>)
                .put(handlers::update_entity::<S, E>)
                .delete(handlers::delete_entity::<S, E>),
        )
}
