use roomrelay::{app, AppState, Config};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    roomrelay::capture_local_offset();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roomrelay=info".parse()?))
        .init();

    let bind_addr = config.bind_addr;
    let app = app(AppState::new(config))?;

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("relay listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
