use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;

use ffmpeg_server::app;
use ffmpeg_server::config::settings::AppConfig;
use ffmpeg_server::modules::jobs::store::JobStore;
use ffmpeg_server::scheduler::dispatcher;
use ffmpeg_server::shutdown;
use ffmpeg_server::state::AppState;
use ffmpeg_server::workers::FfmpegTranscoder;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting ffmpeg-server...");

    let config = AppConfig::new();
    let store = Arc::new(JobStore::new());
    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone()));
    let shutdown = shutdown::install_shutdown_handler();

    let scheduler = dispatcher::start(&config, store.clone(), transcoder, shutdown.clone());
    let state = AppState::new(config.clone(), store, scheduler);

    let app = app::create_app(state).await;

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .unwrap();

    info!("Server stopped");
}
