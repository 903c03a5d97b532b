use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use brokerage_api::{config::Config, create_router, db, storage::UploadStore, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,brokerage_api=debug,tower_http=debug")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Brokerage API - Starting...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let uploads = UploadStore::new(&config.upload_dir);
    uploads.ensure_root().await?;
    tracing::info!("Serving uploads from {}", uploads.root().display());

    let state = AppState::new(pool, &config);

    if let Some(seed) = &config.seed_admin {
        state.auth_service.seed_admin(&seed.email, &seed.password).await?;
    }

    let app = create_router(state, &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Brokerage API is running on http://{}", addr);
    tracing::info!("Dashboard clients should use {}", config.public_api_url);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
