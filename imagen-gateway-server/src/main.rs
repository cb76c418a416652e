//! Imagen gateway HTTP service.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use imagen_gateway::ImageService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = Arc::new(ImageService::from_env());
    info!(model = %service.model(), "starting imagen gateway");

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listen address");
    info!(%addr, "listening");
    axum::serve(listener, routes::router(service))
        .await
        .expect("server error");
}
