//! MongoDB connection bootstrap.

use crate::config::{ConnectionOptions, ConnectionTarget};
use crate::error::{AppError, ConfigError};
use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::time::Duration;

/// Apply the configured options on top of the options parsed from the URI.
pub fn apply_options(client_options: &mut ClientOptions, opts: &ConnectionOptions) {
    if let Some(app) = &opts.app_name {
        client_options.app_name = Some(app.clone());
    }
    if let Some(min) = opts.min_pool_size {
        client_options.min_pool_size = Some(min);
    }
    if let Some(max) = opts.max_pool_size {
        client_options.max_pool_size = Some(max);
    }
    if let Some(ms) = opts.connect_timeout_ms {
        client_options.connect_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = opts.server_selection_timeout_ms {
        client_options.server_selection_timeout = Some(Duration::from_millis(ms));
    }
}

/// Open a client for the target, select the database and ping it.
/// Failures are returned to the caller instead of surfacing later on the first query.
pub async fn connect(target: &ConnectionTarget) -> Result<Database, AppError> {
    let (uri, opts) = target.normalize();
    let mut client_options = ClientOptions::parse(&uri).await?;
    apply_options(&mut client_options, &opts);
    let client = Client::with_options(client_options)?;
    let database = match &opts.db_name {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .ok_or_else(|| ConfigError::Connection("no database in connection string and no dbName option".into()))?,
    };
    ping(&database).await?;
    tracing::info!(database = %database.name(), "connected to mongodb");
    Ok(database)
}

pub async fn ping(database: &Database) -> Result<(), AppError> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
