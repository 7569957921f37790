use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use sse::broadcaster::{DEFAULT_INTAKE_CAPACITY, DEFAULT_SUBSCRIBER_CAPACITY};
use sse::BroadcastOptions;
use std::path::{Path, PathBuf};

/// Origin value that allows any origin to read server responses.
pub const ANY_ORIGIN: &str = "*";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses, or `*` for any.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = ANY_ORIGIN
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8081)]
    pub port: u16,

    /// Number of published chat messages that may wait for dispatch before new ones are rejected
    #[arg(long, env, default_value_t = DEFAULT_INTAKE_CAPACITY,
        value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize))]
    pub intake_capacity: usize,

    /// Number of chat messages a single listener may have queued before it starts missing messages
    #[arg(long, env, default_value_t = DEFAULT_SUBSCRIBER_CAPACITY,
        value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize))]
    pub subscriber_capacity: usize,

    /// Seconds between keep-alive comments sent on idle chat streams
    #[arg(long, env, default_value_t = 15)]
    pub keep_alive_interval_secs: u64,

    /// Path to the HTML page served at `/`
    #[arg(long, env, default_value = "assets/index.html")]
    index_file: PathBuf,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("0.0.0.0")
    }

    /// The `host:port` address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.interface(), self.port)
    }

    pub fn index_file(&self) -> &Path {
        &self.index_file
    }

    pub fn set_index_file(mut self, index_file: PathBuf) -> Self {
        self.index_file = index_file;
        self
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == ANY_ORIGIN)
    }

    pub fn broadcast_options(&self) -> BroadcastOptions {
        BroadcastOptions::new(self.intake_capacity, self.subscriber_capacity)
    }
}
