use anyhow::Context;
use hookroom::{AppState, config::Config, form};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hookroom=debug,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let bind_address = config.bind_address.clone();
    tracing::info!(
        registry = %config.webhook_server_url,
        api = %config.api_prefix,
        names = %config.name_source_url,
        "starting webhooks generator"
    );

    let app = form::app(AppState::from_config(config)?)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("could not bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
