use ::sse::Broadcaster;
use log::*;
use service::AppState;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

mod controller;
mod error;
mod params;
pub mod router;
mod sse;

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
pub async fn init_server(app_state: AppState) -> io::Result<()> {
    let address = app_state.config.bind_address();
    let listener = TcpListener::bind(&address).await?;

    info!("Server starting... listening for connections on http://{address}");

    let broadcaster = Arc::clone(&app_state.broadcaster);
    serve(listener, app_state, shutdown_signal(broadcaster)).await
}

/// Serves the chat routes on an already bound listener until `shutdown` resolves.
///
/// Open chat streams never finish on their own, so `shutdown` must close them
/// (by shutting the broadcaster down) for graceful shutdown to complete.
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router::define_routes(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal(broadcaster: Arc<Broadcaster>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing chat streams");
    broadcaster.shutdown().await;
}
