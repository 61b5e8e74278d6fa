pub mod agent_engine;
pub mod browser;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

use crate::agent_engine::engine::ReviewEngine;
use crate::agent_engine::state::RunSummary;
use crate::browser::driver::PageDriver;
use crate::browser::webdriver::WebDriverSession;
use crate::cli::Cli;
use crate::config::{load_config, Credentials};
use crate::errors::ScoutResult;
use crate::llm::prompt::Criteria;
use crate::llm::registry::build_provider;

/// Installs the global subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Full run: config, credentials, provider, browser, login, review loop.
/// The browser is shut down on every path once it has been launched.
pub async fn run(cli: Cli) -> ScoutResult<RunSummary> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let credentials = Credentials::from_env()?;
    let criteria = Criteria::load(&config.paths.criteria_file)?;
    let provider = build_provider(&config, cli.provider, cli.model.as_deref())?;
    println!("Using provider: {} (model: {})", provider.name(), provider.model());

    let browser = WebDriverSession::launch(&config.browser).await?;

    let result = async {
        let mut engine = ReviewEngine::new(&browser, provider, criteria, &config)?;
        engine.login(&credentials).await?;
        engine.run_loop().await
    }
    .await;

    if let Err(e) = browser.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }
    result
}
