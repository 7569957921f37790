use config::Config;
use log::info;
use sse::Broadcaster;
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Creates the process-wide broadcaster and starts its dispatch loop.
///
/// Must be called from within a Tokio runtime.
pub fn init_broadcaster(config: &Config) -> Broadcaster {
    let options = config.broadcast_options();
    info!(
        "Broadcaster config: intake_capacity={}, subscriber_capacity={}",
        options.intake_capacity, options.subscriber_capacity,
    );

    Broadcaster::spawn(options)
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<Broadcaster>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, broadcaster: &Arc<Broadcaster>) -> Self {
        Self {
            broadcaster: Arc::clone(broadcaster),
            config: app_config,
        }
    }

    pub fn broadcaster_ref(&self) -> &Broadcaster {
        self.broadcaster.as_ref()
    }
}
