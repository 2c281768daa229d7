mod feed;
mod problem;
mod reactions;
mod router;
mod telemetry;

use std::net::SocketAddr;

use tracing::info;

use jobboard_storage::Database;
use jobboard_upstream::JobApiClient;
use jobboard_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    if let Some(path) = env_file {
        info!(stage = "app", path = %path.display(), "loaded env file");
    }
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let client = JobApiClient::with_timeout(config.job_api_base_url.clone(), config.job_api_timeout)?;
    info!(stage = "app", base_url = %client.base_url(), "job api client ready");
    let feed = feed::FeedService::new(client);

    let state = router::AppState::new(metrics, database, feed, config.sse_heartbeat).await;

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
