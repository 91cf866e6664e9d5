//! Meridian Accounts API - AWS Lambda Runtime

use lambda_http::{run, Error};
use meridian_common::Config;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::info;

use meridian_app::{body_limit_layer, build_cors_layer, create_app};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .without_time()
        .init();

    info!("Initializing Meridian Accounts API Lambda");

    let config =
        Config::from_env().map_err(|e| Error::from(format!("configuration error: {e}")))?;

    let pool = PgPool::connect(&config.database_url)
        .await
        .map_err(|e| Error::from(format!("database error: {e}")))?;

    info!("Database connection established");

    let app = create_app(config, pool)
        .await
        .map_err(|e| Error::from(format!("app initialization error: {e}")))?;

    let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .map_err(|_| Error::from("CORS_ALLOWED_ORIGINS environment variable is required"))?;

    let router = app
        .router
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&cors_origins))
        .layer(body_limit_layer());

    info!("Meridian Accounts API Lambda ready to serve requests");

    run(router).await
}
