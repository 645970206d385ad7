//! Example server: loads settings from env (or `APP_CONFIG` JSON file), registers the models under
//! `MODEL_DIR` (default `demos/models`), mounts model, metadata and common routes.

use ibird_mongoose::{AppConfig, MountOptions, Plugin};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ibird_mongoose=info")),
        )
        .init();

    let mut config = match std::env::var("APP_CONFIG") {
        Ok(path) => AppConfig::from_file(path).await?,
        Err(_) => AppConfig::from_env()?,
    };
    if config.model_dir.is_none() {
        config.model_dir = Some("demos/models".into());
    }
    if config.metadata_path.is_none() {
        config.metadata_path = Some("/metadata".into());
    }

    let mut plugin = Plugin::on_load(&config).await?;
    plugin.on_post_register(|m| tracing::info!(model = %m.name, collection = %m.collection(), "available"));

    let options = MountOptions::from_config(&config).locale(|key| match key {
        "model_not_found" => Some("no model named {name}".to_string()),
        _ => None,
    });
    let app = plugin.on_play(options).await?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
