pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use logic::{ViewQuery, ViewResult};
pub use model::*;
pub use store::{Connection, ConnectionState, CouchStore, DocumentStore, StoreError, StoreResult};

use anyhow::Context;
use log::info;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;

/// Connects to CouchDB and, when `provision` is set, creates the database
/// and installs the bundled design documents.
pub async fn bootstrap_store(config: &AppConfig) -> anyhow::Result<Arc<CouchStore>> {
    let connection = Arc::new(Connection::new(config.couchdb.clone()));
    let store = CouchStore::new(connection.clone());

    if config.couchdb.provision {
        store
            .create_database()
            .await
            .with_context(|| format!("Failed to create database {}", config.couchdb.db))?;
    }

    connection
        .establish()
        .await
        .with_context(|| format!("Failed to connect to {}", config.couchdb.server_url()))?;
    if !connection.is_connected() {
        anyhow::bail!(
            "{} did not answer for database {}",
            config.couchdb.server_url(),
            config.couchdb.db
        );
    }

    if config.couchdb.provision {
        store.install_designs().await?;
        info!("design documents installed");
    }

    Ok(Arc::new(store))
}

/// Router with every endpoint, CORS enabled, bound to `store`.
pub fn build_app(store: Arc<CouchStore>) -> axum::Router {
    routes::create_router()
        .layer(CorsLayer::permissive())
        .with_state(store)
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let store = bootstrap_store(&config).await?;
    let app = build_app(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("CV backend listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
