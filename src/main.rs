use clap::Parser;
use sqlscribe::{config, server};

/// sqlscribe - natural-language SQL authoring for ClickHouse
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Directory holding the prompt templates
    #[arg(long, default_value = "./prompts")]
    prompt_dir: String,

    /// Directory holding the page templates
    #[arg(long, default_value = "./tpl")]
    template_dir: String,

    /// Base URL of the OpenAI-compatible completion service
    #[arg(long, default_value = "https://api.openai.com/v1")]
    completion_url: String,

    /// Completion model identifier
    #[arg(long, default_value = "gpt-3.5-turbo-instruct")]
    model: String,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.host,
            http_port: cli.port,
            prompt_dir: cli.prompt_dir,
            template_dir: cli.template_dir,
            completion_base_url: cli.completion_url,
            completion_model: cli.model,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment (API key, ClickHouse
    // credentials).
    dotenvy::dotenv().ok();

    // Defaults to INFO, override with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!("\nsqlscribe v{}\n", env!("CARGO_PKG_VERSION"));

    let cli_config: config::CliConfig = cli.into();
    let config = match config::ServerConfig::from_cli(cli_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    server::run_with_config(config).await;
}
