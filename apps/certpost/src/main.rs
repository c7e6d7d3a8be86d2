mod cli;
mod config;
mod context;
mod errors;
mod generation;
mod inbox;
mod llm_client;
mod shapes;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::context::bank::ContextBank;
use crate::context::classifier::KeywordEventClassifier;
use crate::generation::generator::LlmPostGenerator;
use crate::llm_client::LlmClient;
use crate::shapes::history::FileShapeStore;
use crate::shapes::selector::select_next_shape;
use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Load configuration first; the API key is checked once there is work to do
    let config = Config::from_env(cli.base_dir.clone());

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting certpost v{}", env!("CARGO_PKG_VERSION"));

    let paths = config.paths();
    for dir in [&paths.inbox, &paths.done] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let certs = cli::discover(cli.file.as_deref(), &paths.inbox)?;
    if certs.is_empty() {
        cli::print_empty_inbox(&paths.inbox);
        return Ok(ExitCode::SUCCESS);
    }

    // Initialize context bank
    let context_bank = ContextBank::load(&paths.context_bank)?;

    // Initialize LLM client
    let llm = LlmClient::new(config.require_api_key()?.to_string());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize shape history store
    let shape_store = FileShapeStore::new(&paths.shape_state);
    info!("Shape history: {}", shape_store.path().display());

    // Build app state
    let state = AppState {
        paths: paths.clone(),
        generator: Arc::new(LlmPostGenerator(llm)),
        classifier: Arc::new(KeywordEventClassifier),
        shape_store: Arc::new(shape_store),
        context_bank: Arc::new(context_bank),
    };

    let tone = cli.tone();
    info!("Processing {} certificate(s), tone={tone}", certs.len());

    let report = cli::run(&state, &certs, tone, cli.should_prompt()).await;
    let next_shape = select_next_shape(&state.shape_store.load());
    cli::print_report(&report, next_shape);

    Ok(if report.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
