use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gemini_core::client::GeminiClient;
use gemini_search::config::AppConfig;
use gemini_search::coordinator::SearchCoordinator;
use gemini_search::http_server::{self, AppState};
use gemini_search::provider::GeminiProvider;
use gemini_search::session::SessionStoreRef;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "search-daemon", about = "Grounded conversational search over HTTP")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API key (defaults to GOOGLE_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Gemini model to use
    #[arg(short = 'o', long)]
    model: Option<String>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    info!("Starting search daemon");

    // Load config from file or use defaults
    let mut config = match &args.config {
        Some(config_path) => match AppConfig::load_from_file(config_path) {
            Ok(cfg) => {
                info!("Loaded configuration from {}", config_path.display());
                cfg
            }
            Err(e) => {
                error!("Failed to load configuration from {}: {}", config_path.display(), e);
                return Err(anyhow::anyhow!("Configuration error: {}", e));
            }
        },
        None => AppConfig::load_from_default().map_err(|e| {
            error!("Failed to load configuration: {}", e);
            anyhow::anyhow!("Configuration error: {}", e)
        })?,
    };

    // Update config from CLI args
    if let Some(api_key) = args.api_key {
        config.gemini.api_key = Some(api_key);
    }
    if let Some(model) = args.model {
        config.gemini.model_name = Some(model);
    }
    if let Some(http_addr) = args.http_addr {
        config.http_addr = http_addr;
    }

    // Initialize Gemini client
    let gemini_client = match GeminiClient::new(config.gemini.clone()) {
        Ok(client) => {
            info!(model = config.gemini.model(), "Initialized Gemini client");
            client
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Gemini client");
            return Err(anyhow::anyhow!("Failed to initialize Gemini client: {}", e));
        }
    };

    let store: SessionStoreRef = Arc::new(config.sessions.build_store());
    info!(
        capacity = config.sessions.capacity,
        idle_ttl_secs = config.sessions.idle_ttl_secs,
        "Initialized session store"
    );

    if config.sessions.idle_ttl().is_some() {
        let sweep_store = store.clone();
        let interval = config.sessions.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = sweep_store.cleanup_expired_sessions().await {
                    error!(error = %e, "Session sweep failed");
                }
            }
        });
    }

    let coordinator = SearchCoordinator::new(store, Arc::new(GeminiProvider::new(gemini_client)));

    if let Err(e) = http_server::run_server(AppState::new(coordinator), config.http_addr).await {
        error!(error = %e, "HTTP server failed");
        return Err(e);
    }

    info!("Search daemon shutting down");
    Ok(())
}
