use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use clickhouse::Client;
use dotenvy::dotenv;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

use crate::catalog::reader::ClickHouseCatalog;
use crate::catalog::schema_compiler::{self, CommentIndex, SchemaSnapshot};
use crate::config::ServerConfig;
use crate::llm::CompletionClient;
use crate::prompt::TemplateStore;

mod clickhouse_client;
pub mod handlers;
mod models;
pub mod query_runner;

/// Prompt templates every deployment must ship; verified once at startup.
const REQUIRED_PROMPTS: [&str; 3] = ["sql", "idk", "graph"];

/// Outer bound on one request; the completion client applies its own tighter
/// deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared per-process state. Everything here is read-only after startup, so
/// concurrent request handlers need no synchronization.
pub struct AppState {
    pub clickhouse: Client,
    pub snapshot: Arc<SchemaSnapshot>,
    pub comments: Arc<CommentIndex>,
    /// Full-schema text, rendered once and cached for the process lifetime.
    pub schema_text: String,
    /// Structured schema, pre-serialized for embedding into the page.
    pub schema_json: String,
    pub prompts: TemplateStore,
    pub pages: TemplateStore,
    pub completions: CompletionClient,
    pub config: ServerConfig,
}

pub async fn run() {
    dotenv().ok();

    // Load server configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    run_with_config(config).await;
}

pub async fn run_with_config(config: ServerConfig) {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, model={}",
        config.http_host,
        config.http_port,
        config.completion_model
    );
    if config.default_api_key.is_none() {
        // Not fatal: the UI can supply a key per request.
        log::warn!("OPENAI_API_KEY is not set; requests must carry their own key");
    }

    let (clickhouse, database) = match clickhouse_client::try_get_client() {
        Some(pair) => pair,
        None => {
            log::error!(
                "✗ ClickHouse connection is not configured \
                 (CLICKHOUSE_URL, CLICKHOUSE_USER, CLICKHOUSE_PASSWORD, CLICKHOUSE_DATABASE)"
            );
            std::process::exit(1);
        }
    };

    // The schema snapshot is built exactly once. There is no degraded mode:
    // without a schema the service has nothing to offer.
    let catalog = ClickHouseCatalog::new(clickhouse.clone(), database.clone());
    let (snapshot, comments) = match SchemaSnapshot::build(&catalog, &database).await {
        Ok(built) => built,
        Err(e) => {
            log::error!("✗ Failed to build schema snapshot: {}", e);
            log::error!("  Server cannot start without a schema.");
            std::process::exit(1);
        }
    };
    log::info!(
        "✓ Schema snapshot built: {} tables, {} column comments",
        snapshot.tables.len(),
        comments.len()
    );

    let prompts = TemplateStore::new(&config.prompt_dir);
    if let Err(e) = prompts.verify(&REQUIRED_PROMPTS) {
        log::error!("✗ Prompt template check failed: {}", e);
        std::process::exit(1);
    }
    let pages = TemplateStore::with_extension(&config.template_dir, "html");
    if let Err(e) = pages.verify(&["index"]) {
        log::error!("✗ Page template check failed: {}", e);
        std::process::exit(1);
    }

    let completions =
        match CompletionClient::new(config.completion_base_url.clone(), config.completion_model.clone()) {
            Ok(client) => client,
            Err(e) => {
                log::error!("✗ Failed to create completion client: {}", e);
                std::process::exit(1);
            }
        };

    let (schema_text, structured) = schema_compiler::render_full(&snapshot, &comments);
    let schema_json = Value::Object(structured).to_string();

    let app_state = Arc::new(AppState {
        clickhouse,
        snapshot: Arc::new(snapshot),
        comments: Arc::new(comments),
        schema_text,
        schema_json,
        prompts,
        pages,
        completions,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/generate", post(handlers::generate))
        .route("/run", post(handlers::run_query))
        .route("/generate_prompt", post(handlers::generate_prompt))
        .route("/generate_chart", post(handlers::generate_chart))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::new())
        .with_state(app_state);

    let bind_address = format!("{}:{}", config.http_host, config.http_port);
    log::info!("Starting HTTP server on {}", bind_address);

    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("✗ FATAL: Failed to bind HTTP listener to {}: {}", bind_address, e);
            log::error!("  Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    println!("sqlscribe is running at http://{}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("HTTP server fatal error: {:?}", e);
        std::process::exit(1);
    }
}
