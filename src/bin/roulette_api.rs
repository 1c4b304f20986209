//! Read-only query API over the stored roulette results.

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use roulette_feed::api::{create_router, ApiState};
use roulette_feed::config::{api_bind_from_env, db_path_from_env};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roulette_feed=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let db_path = db_path_from_env();
    let app = create_router(ApiState::new(db_path.clone()));

    let addr = api_bind_from_env();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("[API] Serving {} on {}", db_path, addr);
    axum::serve(listener, app).await?;

    Ok(())
}
