use anyhow::Context;
use packscan::{router, AppState, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("packscan=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let state = AppState::from_settings(&settings)?;
    let app = router(state, settings.body_limit);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("server running on http://{}", settings.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
