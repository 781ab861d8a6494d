//! stealth-browse CLI
//!
//! Opens a search engine, lets the model find the search form, searches for a query and opens
//! the first results in new tabs, taking screenshots along the way.

use anyhow::{Context, Result};
use clap::Parser;
use stealth_browse::browser::{BrowserSession, ConnectionOptions, InteractionConfig, LaunchOptions};
use stealth_browse::llm::{ChatCompletionClient, LlmConfig, RaceResolver};
use stealth_browse::tools::normalize_url;
use stealth_browse::workflow::{SearchWorkflow, WorkflowOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stealth-browse")]
#[command(version)]
#[command(about = "Model-guided, human-like search automation", long_about = None)]
struct Cli {
    /// Search engine homepage
    url: String,

    /// Text to search for
    query: String,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Number of results to open
    #[arg(long, short = 'n', default_value = "3")]
    results: usize,

    /// Directory for screenshots (default: $SCREENSHOT_DIR or /workspace)
    #[arg(long, value_name = "DIR")]
    screenshot_dir: Option<PathBuf>,

    /// Character budget of one summary chunk
    #[arg(long, default_value = "2000")]
    chunk_limit: usize,

    /// Per-request model timeout in seconds
    #[arg(long, default_value = "180")]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Configuration problems are reported before the browser is touched
    let llm = LlmConfig::from_env().context("model endpoint is not configured")?;
    log::info!("Model: {} at {}", llm.model, llm.api_base);

    let mut config = InteractionConfig::from_env();
    config.chunk_limit = cli.chunk_limit;
    if let Some(dir) = cli.screenshot_dir {
        config.screenshot_dir = dir;
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    let session = match cli.ws_endpoint {
        Some(endpoint) => {
            log::info!("Connecting to {}", endpoint);
            BrowserSession::connect(ConnectionOptions::new(endpoint))?
        }
        None => {
            let mut options = LaunchOptions::new().headless(!cli.headed);
            if let Some(path) = cli.executable_path {
                options = options.chrome_path(path);
            }
            if let Some(dir) = cli.user_data_dir {
                options = options.user_data_dir(dir);
            }
            log::info!("Launching browser ({})", if options.headless { "headless" } else { "headed" });
            BrowserSession::launch(options)?
        }
    };
    let page = session.first_page()?;

    let mut options = WorkflowOptions::new(cli.query);
    options.max_results = cli.results;
    options.model_timeout = Duration::from_secs(cli.timeout_secs);

    let resolver = RaceResolver::new(Arc::new(ChatCompletionClient::new(llm)));
    let mut workflow = SearchWorkflow::new(config, resolver, runtime.handle().clone(), options);

    let report = workflow.run(&session, &page, &normalize_url(&cli.url)).context("search run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
