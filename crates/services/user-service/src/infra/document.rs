//! MongoDB client bootstrap.

use std::time::Duration;

use mongodb::{bson::doc, options::ClientOptions, Client};

use common::DocumentStoreConfig;

/// How long the driver may search for a reachable server
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned MongoDB client plus the database the service works in.
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
    database: mongodb::Database,
}

impl DocumentStore {
    /// Connect and ping the server.
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self, mongodb::error::Error> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("user-service".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.connect_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = Client::with_options(options)?;
        let store = Self {
            database: client.database(&config.database),
            client,
        };
        store.ping().await?;

        tracing::info!(database = %config.database, "MongoDB connected");
        Ok(store)
    }

    /// Handle to the service database.
    pub fn database(&self) -> mongodb::Database {
        self.database.clone()
    }

    /// Check connectivity with the `ping` command.
    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Close pooled connections.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB connection closed");
    }
}
