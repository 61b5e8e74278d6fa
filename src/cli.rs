use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;
use crate::llm::registry::ProviderKind;

/// Reviews co-founder profiles with a vision model and acts on each verdict.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Vision provider to evaluate profiles with.
    #[arg(long, short = 'p', value_enum, default_value_t = ProviderKind::OpenAi)]
    pub provider: ProviderKind,

    /// Model override for the selected provider.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Path to a profile-scout.toml. Searched for when omitted.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of distinct profiles to process.
    #[arg(long, short = 'b', value_parser = clap::value_parser!(u64).range(1..))]
    pub budget: Option<u64>,

    /// Run the browser without a window.
    #[arg(long, default_value_t = false)]
    pub headless: bool,
}

impl Cli {
    /// Command-line values take precedence over the config file.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(budget) = self.budget {
            config.run.budget = budget as usize;
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}
