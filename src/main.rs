use actix_web::{web, App, HttpServer};
use examflow_progress::api::{self, AppState};
use examflow_progress::config::Config;
use examflow_progress::store::FileStore;
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("examflow_progress=info")),
        )
        .init();

    let config_path = Config::resolve_path(std::env::args().nth(1));
    let config = Config::load(&config_path)?;

    let store = FileStore::new(&config.data_dir)?.with_quota(config.store_quota_bytes);
    tracing::info!("Progress data stored in {}", store.dir().display());

    let state = web::Data::new(AppState::new(Box::new(store), &config));

    tracing::info!(
        "Starting ExamFlow progress service on http://{}:{}",
        config.bind_host,
        config.bind_port
    );

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind((config.bind_host.as_str(), config.bind_port))?
        .run()
        .await?;

    Ok(())
}
