use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use parley_agent::{CompletionBackend, CompletionOptions, NullBackend, OpenAiBackend};
use parley_bridge::{Bridge, CompletionOrchestrator, ConversationManager};
use parley_context::{ContextStore, MemoryContextStore, SqliteContextStore};
use parley_core::config::ParleyConfig;

mod app;
mod error;
mod http;
mod rocketchat;
mod settings;

#[derive(Debug, Parser)]
#[command(name = "parley-gateway", version, about = "Chat-completion bridge for Rocket.Chat")]
struct Cli {
    /// Path to parley.toml (defaults to ~/.parley/parley.toml).
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley_gateway=info,parley_bridge=info,tower_http=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = ParleyConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ParleyConfig::default()
    });

    let rc_config = config
        .rocketchat
        .clone()
        .context("missing [rocketchat] section: server_url, user_id and auth_token are required")?;

    let store = open_store(&config)?;
    let backend = build_backend(&config);
    let backend_name = backend.name().to_string();
    info!(backend = %backend_name, model = %config.completion.model, "completion backend ready");

    let host = Arc::new(rocketchat::RocketChatHost::new(&rc_config));
    let settings = Arc::new(settings::PolicySettings::new(cli.config.clone(), config.policy));
    let orchestrator = CompletionOrchestrator::new(
        backend,
        host.clone(),
        CompletionOptions::from_config(&config.completion),
    );
    let bridge = Bridge::new(
        host.clone(),
        host.clone(),
        settings,
        host.clone(),
        ConversationManager::new(store),
        orchestrator,
    );

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState {
        config,
        backend_name,
        host,
        bridge: Arc::new(bridge),
    });
    let router = app::build_router(state);

    info!("Parley gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

fn open_store(config: &ParleyConfig) -> anyhow::Result<Arc<dyn ContextStore>> {
    if config.database.ephemeral {
        info!("using in-memory context store, contexts are lost on restart");
        return Ok(Arc::new(MemoryContextStore::new()));
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    parley_context::db::init_db(&db)?;
    info!("database migrations complete");

    Ok(Arc::new(SqliteContextStore::new(db)))
}

/// Real backend when an API key is configured, otherwise a placeholder that
/// fails every request with a visible message.
fn build_backend(config: &ParleyConfig) -> Arc<dyn CompletionBackend> {
    match config.completion.api_key.clone() {
        Some(key) if !key.is_empty() => Arc::new(OpenAiBackend::new(
            key,
            config.completion.organization.clone(),
            Some(config.completion.base_url.clone()),
        )),
        _ => {
            tracing::warn!("completion.api_key not set, every request will fail");
            Arc::new(NullBackend)
        }
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
