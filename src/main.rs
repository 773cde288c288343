use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatterbox_tts_server::api::routes::{create_router, AppState};
use chatterbox_tts_server::config::ServerConfig;
use chatterbox_tts_server::tts::{TtsModel, TtsService, TurboEngine};

fn main() {
    let config = ServerConfig::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // The runtime is built by hand so --workers can size it
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(run(config));
}

async fn run(config: ServerConfig) {
    let addr: SocketAddr = config.bind_addr().parse().expect("Invalid address");

    tracing::info!("Chatterbox TTS Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!("Model directory: {}", config.model_dir.display());

    let model_dir = config.model_dir.clone();
    let tts = TtsService::new(move || {
        TurboEngine::load(&model_dir).map(|engine| Box::new(engine) as Box<dyn TtsModel>)
    });

    if config.preload {
        tts.preload().await.expect("Failed to load TTS model");
        tracing::info!("Model loaded");
    }

    let state = Arc::new(AppState { tts });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}
