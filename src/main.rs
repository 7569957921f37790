use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting chatroom...");

    let broadcaster = Arc::new(service::init_broadcaster(&config));
    let app_state = AppState::new(config, &broadcaster);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server exited with an error: {e}");
        broadcaster.shutdown().await;
        std::process::exit(1);
    }

    broadcaster.shutdown().await;
    info!("Chatroom stopped");
}
