use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::browser::resolver::ResolverConfig;
use crate::browser::wait::WaitConfig;
use crate::errors::{ScoutError, ScoutResult};

pub const CONFIG_FILE_NAME: &str = "profile-scout.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    /// Per-target locator overrides, e.g. `skip_for_now = ["css:button.skip"]`.
    #[serde(default)]
    pub selectors: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_start_url")]
    pub start_url: String,
    /// Maximum number of distinct profile addresses to process.
    #[serde(default = "default_budget")]
    pub budget: usize,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_zoom")]
    pub zoom_percent: u32,
    #[serde(default = "default_max_revisits")]
    pub max_consecutive_revisits: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            budget: default_budget(),
            prompt: default_prompt(),
            zoom_percent: default_zoom(),
            max_consecutive_revisits: default_max_revisits(),
        }
    }
}

fn default_start_url() -> String {
    "https://www.startupschool.org/cofounder-matching/candidate/next".to_string()
}

fn default_budget() -> usize {
    10
}

fn default_prompt() -> String {
    "Evaluate the profile and tell me if they are a good fit for me.".to_string()
}

fn default_zoom() -> u32 {
    45
}

fn default_max_revisits() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default)]
    pub chrome_binary: Option<String>,
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            chrome_binary: None,
            args: default_browser_args(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_browser_args() -> Vec<String> {
    [
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
        "--disable-plugins",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-locator presence probe.
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,
    #[serde(default = "default_ten_seconds")]
    pub interactable_ms: u64,
    #[serde(default = "default_ten_seconds")]
    pub transition_ms: u64,
    #[serde(default = "default_ten_seconds")]
    pub login_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Provider HTTP request timeout.
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: default_probe_ms(),
            interactable_ms: default_ten_seconds(),
            transition_ms: default_ten_seconds(),
            login_ms: default_ten_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            request_secs: default_request_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            probe: WaitConfig::new(self.probe_ms, self.poll_interval_ms),
            interactable: WaitConfig::new(self.interactable_ms, self.poll_interval_ms),
        }
    }

    pub fn transition(&self) -> WaitConfig {
        WaitConfig::new(self.transition_ms, self.poll_interval_ms)
    }

    pub fn login(&self) -> WaitConfig {
        WaitConfig::new(self.login_ms, self.poll_interval_ms)
    }
}

fn default_probe_ms() -> u64 {
    3_000
}

fn default_ten_seconds() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_request_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_criteria_file")]
    pub criteria_file: PathBuf,
    #[serde(default = "default_dot")]
    pub snapshot_dir: PathBuf,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
    #[serde(default = "default_dot")]
    pub diagnostics_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            criteria_file: default_criteria_file(),
            snapshot_dir: default_dot(),
            archive_dir: default_archive_dir(),
            diagnostics_dir: default_dot(),
        }
    }
}

fn default_criteria_file() -> PathBuf {
    PathBuf::from("criteria.txt")
}

fn default_dot() -> PathBuf {
    PathBuf::from(".")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("saved_profiles")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub openai: ProviderEntry,
    #[serde(default)]
    pub anthropic: ProviderEntry,
    #[serde(default)]
    pub ollama: ProviderEntry,
}

/// Per-provider overrides. Anything left unset falls back to the provider's
/// built-in defaults (see `llm::registry`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub api_base: Option<String>,
    pub model: Option<String>,
    /// Key stored in the config file; the environment variable wins when set.
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub input_price_per_mtok: Option<f64>,
    pub output_price_per_mtok: Option<f64>,
}

/// Login credentials, read from `YC_USERNAME` / `YC_PASSWORD`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub const USERNAME_ENV: &'static str = "YC_USERNAME";
    pub const PASSWORD_ENV: &'static str = "YC_PASSWORD";

    pub fn from_env() -> ScoutResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ScoutResult<Self> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        match (read(Self::USERNAME_ENV), read(Self::PASSWORD_ENV)) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            (username, password) => {
                let missing: Vec<&str> = [
                    username.is_none().then_some(Self::USERNAME_ENV),
                    password.is_none().then_some(Self::PASSWORD_ENV),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(ScoutError::MissingCredentials(format!(
                    "set {} (environment or .env file)",
                    missing.join(" and ")
                )))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> ScoutResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ScoutError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(Some(candidate));
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(Some(candidate));
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("profile-scout").join(CONFIG_FILE_NAME);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Loads the config file if one can be found, otherwise the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> ScoutResult<AppConfig> {
    let Some(path) = resolve_config_path(explicit)? else {
        tracing::info!("no {CONFIG_FILE_NAME} found, using built-in defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), budget = config.run.budget, "config loaded");
    Ok(config)
}

pub fn parse_config(content: &str) -> ScoutResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if config.run.budget == 0 {
        return Err(ScoutError::Config("run.budget must be at least 1".into()));
    }
    Ok(config)
}
