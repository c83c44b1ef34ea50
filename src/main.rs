use std::net::SocketAddr;
use tokio::net::TcpListener;
use training_registry::{app, AppState, PgStore, Settings, StorageBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("training_registry=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let state = match settings.storage {
        StorageBackend::Postgres => AppState::postgres(PgStore::connect(&settings).await?),
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            AppState::in_memory()
        }
    };

    let router = app(state, settings.body_limit);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Server is listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
