use mock_server::MockState;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let state = match std::env::var("MIXGARDEN_API_KEY") {
        Ok(key) if !key.is_empty() => MockState::with_api_key(key),
        _ => MockState::new(),
    };
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock mixgarden listening");
    mock_server::run_with(listener, state).await
}
