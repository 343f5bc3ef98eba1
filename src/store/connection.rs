use log::{info, warn};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::watch;

use crate::config::CouchConfig;
use crate::store::{StoreError, StoreResponse, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// The probe failed. There is no automatic retry.
    Failed { code: String, message: String },
}

/// Link to one database on a CouchDB server.
///
/// Construction does no I/O. `establish` probes the database once; callers
/// learn the outcome from its result or through `subscribe`.
#[derive(Debug)]
pub struct Connection {
    config: CouchConfig,
    client: Client,
    url: RwLock<Option<String>>,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    pub fn new(config: CouchConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: CouchConfig, client: Client) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            client,
            url: RwLock::new(None),
            state,
        }
    }

    pub fn config(&self) -> &CouchConfig {
        &self.config
    }

    /// Probes the database and records the outcome.
    pub async fn establish(&self) -> StoreResult<()> {
        let target = self.config.database_url();
        let reply = match self.request(Method::GET, &target).send().await {
            Ok(response) => read_response(response).await,
            Err(err) => Err(err.into()),
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                warn!("could not reach document store at {}: {}", target, err);
                self.fail(err.code(), &err.to_string());
                return Err(err);
            }
        };

        if database_is_missing(&reply) {
            let err = StoreError::DatabaseMissing {
                database: self.config.db.clone(),
            };
            warn!("database {} does not exist", self.config.db);
            self.fail(err.code(), &err.to_string());
            return Err(err);
        }

        *self.url.write() = Some(target.clone());
        let db_name = reply.body.get("db_name").and_then(Value::as_str);
        if db_name == Some(self.config.db.as_str()) {
            info!("connected to {}", target);
            self.state.send_replace(ConnectionState::Connected);
        } else {
            warn!(
                "{} answered for database {:?}, expected {}",
                target, db_name, self.config.db
            );
            self.state.send_replace(ConnectionState::Disconnected);
        }
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Base URL of the database, only while connected.
    pub fn connection_url(&self) -> Option<String> {
        if !self.is_connected() {
            return None;
        }
        self.url.read().clone()
    }

    /// Forgets the connection. Nothing is closed on the wire.
    pub fn destroy(&self) {
        *self.url.write() = None;
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Request builder carrying the configured credentials.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(username) => builder.basic_auth(username, self.config.password.as_ref()),
            None => builder,
        }
    }

    fn fail(&self, code: &str, message: &str) {
        *self.url.write() = None;
        self.state.send_replace(ConnectionState::Failed {
            code: code.to_string(),
            message: message.to_string(),
        });
    }
}

fn database_is_missing(reply: &StoreResponse) -> bool {
    let reason = reply.body.get("reason").and_then(Value::as_str);
    let error = reply.body.get("error").and_then(Value::as_str);
    reason == Some("no_db_file") || (reply.status == 404 && error == Some("not_found"))
}

/// Reads status and body; a body that is not JSON is kept as a string.
pub(crate) async fn read_response(response: Response) -> StoreResult<StoreResponse> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(StoreResponse::new(status, body))
}
