//! grok-topics - Main entry point
//!
//! Serves the legacy topics API, or runs one reconciliation operation and prints the
//! result as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grok_common::config::{ConfigResolver, TomlConfig, Transport};
use grok_common::db::{init_database, seed_from_file, Difficulty};
use serde::Serialize;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grok_topics::accessor::DataAccessor;
use grok_topics::api::{self, AppState};
use grok_topics::client::ApiClient;
use grok_topics::markdown::{HttpMarkdownSource, LocalMarkdownSource, MarkdownSource};
use grok_topics::resolve::AliasTable;
use grok_topics::snapshot::SnapshotStore;
use grok_topics::store::{CategoryRef, ContentStore, HttpStore, SearchFilters, SqlStore};
use grok_topics::TopicDataService;

/// Command-line arguments for grok-topics
#[derive(Parser, Debug)]
#[command(name = "grok-topics")]
#[command(about = "Topic tree reconciliation between the content database and markdown library")]
#[command(version)]
struct Cli {
    /// Config file (overrides GROK_TOPICS_CONFIG and the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the legacy topics API
    Serve {
        /// Listen address (defaults to bind_address from the config)
        #[arg(short, long, env = "GROK_TOPICS_BIND")]
        bind: Option<String>,
    },
    /// Print the unified tree, or one topic of it
    Tree {
        #[arg(short, long)]
        topic: Option<String>,
    },
    /// List the main categories of a topic
    Categories { topic: String },
    /// Print the detail node of a category
    Details { topic: String, category: String },
    /// List the questions of a category
    Questions { category: String },
    /// Search question text
    Search {
        query: String,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        topic_id: Option<i64>,
        #[arg(long)]
        category_id: Option<i64>,
    },
    /// Rebuild the unified tree and rewrite the snapshot
    Refresh,
    /// Load topics, categories and questions from a JSON fixture
    Seed { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = ConfigResolver::new(cli.config.clone()).resolve();
    let config = loaded.config.clone();

    // Initialize tracing
    let default_filter = format!(
        "grok_topics={level},grok_common={level},tower_http=info",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "grok-topics {} (transport: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.transport
    );
    loaded.report();
    info!("Markdown library: {}", config.markdown_dir.display());

    match cli.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.bind_address.clone());
            serve(&config, &addr).await
        }
        Command::Tree { topic } => {
            let service = build_service(&config).await?;
            match topic {
                Some(topic) => print_json(&service.get_topic_data(&topic).await),
                None => print_json(&service.get_all_topic_data().await),
            }
        }
        Command::Categories { topic } => {
            let service = build_service(&config).await?;
            print_json(&service.get_topic_categories(&topic).await)
        }
        Command::Details { topic, category } => {
            let service = build_service(&config).await?;
            print_json(&service.get_category_details(&topic, &category).await)
        }
        Command::Questions { category } => {
            let service = build_service(&config).await?;
            let questions = service
                .accessor()
                .get_questions_by_category(&CategoryRef::parse(&category))
                .await;
            print_json(&questions)
        }
        Command::Search {
            query,
            difficulty,
            topic_id,
            category_id,
        } => {
            let service = build_service(&config).await?;
            let filters = SearchFilters {
                difficulty,
                topic_id,
                category_id,
            };
            print_json(&service.accessor().search_questions(&query, &filters).await)
        }
        Command::Refresh => {
            let service = build_service(&config).await?;
            if let Some(snapshot) = service.snapshot() {
                snapshot.remove().await?;
            }
            let tree = service
                .try_get_all_topic_data()
                .await
                .context("Failed to rebuild topic data")?;
            info!(topics = tree.len(), "Topic data refreshed");
            print_json(&tree)
        }
        Command::Seed { file } => {
            let pool = init_database(&config.database_path)
                .await
                .context("Failed to open database")?;
            let summary = seed_from_file(&pool, &file)
                .await
                .with_context(|| format!("Failed to seed from {}", file.display()))?;
            info!(
                "Seeded {} topics, {} categories, {} questions",
                summary.topics, summary.categories, summary.questions
            );
            Ok(())
        }
    }
}

/// Service wired to the configured transport
async fn build_service(config: &TomlConfig) -> Result<TopicDataService> {
    let aliases = AliasTable::from_config(config);
    let ttl = Duration::from_secs(config.cache_ttl_secs);

    let (store, markdown): (Arc<dyn ContentStore>, Arc<dyn MarkdownSource>) =
        match config.transport {
            Transport::Direct => {
                let pool = init_database(&config.database_path)
                    .await
                    .context("Failed to open database")?;
                let store: Arc<dyn ContentStore> = Arc::new(SqlStore::new(pool));
                let markdown: Arc<dyn MarkdownSource> = Arc::new(
                    LocalMarkdownSource::new(&config.markdown_dir).with_aliases(aliases.clone()),
                );
                (store, markdown)
            }
            Transport::Http => {
                let client = ApiClient::new(
                    &config.api_base_url,
                    Duration::from_secs(config.request_timeout_secs),
                )
                .context("Failed to build HTTP client")?;
                info!("Using topics API at {}", client.base_url());
                let store: Arc<dyn ContentStore> = Arc::new(HttpStore::from_client(
                    client.clone(),
                    config.domain_guesses.clone(),
                ));
                let markdown: Arc<dyn MarkdownSource> = Arc::new(HttpMarkdownSource::new(client));
                (store, markdown)
            }
        };

    let accessor = Arc::new(DataAccessor::new(store, ttl));
    Ok(TopicDataService::new(accessor, markdown, aliases, ttl)
        .with_snapshot(SnapshotStore::new(config.snapshot_file())))
}

async fn serve(config: &TomlConfig, addr: &str) -> Result<()> {
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let state = AppState::new(
        SqlStore::new(pool),
        LocalMarkdownSource::new(&config.markdown_dir),
        AliasTable::from_config(config),
    );
    let app = api::build_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
