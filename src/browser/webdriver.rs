use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value};

use crate::browser::driver::PageDriver;
use crate::browser::locator::Locator;
use crate::config::BrowserConfig;
use crate::errors::{ScoutError, ScoutResult};

/// True when the element's centre point hits the element itself (or a child),
/// i.e. nothing is layered on top of it.
const UNOBSCURED_SCRIPT: &str = "\
const el = arguments[0];
const r = el.getBoundingClientRect();
const x = r.left + r.width / 2;
const y = r.top + r.height / 2;
const hit = document.elementFromPoint(x, y);
return hit !== null && (hit === el || el.contains(hit));";

/// WebDriver-backed browser session (chromedriver / geckodriver).
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Opens a new browser session against a running WebDriver server.
    pub async fn launch(config: &BrowserConfig) -> ScoutResult<Self> {
        let mut chrome_options: Map<String, Value> = Map::new();
        let mut args: Vec<Value> = config.args.iter().cloned().map(Value::String).collect();
        args.push(Value::String(format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        )));
        if config.headless {
            args.push(Value::String("--headless=new".to_string()));
        }
        chrome_options.insert("args".to_string(), Value::Array(args));

        if let Some(binary) = config.chrome_binary.as_deref().map(str::trim) {
            if !binary.is_empty() {
                chrome_options.insert("binary".to_string(), Value::String(binary.to_string()));
            }
        }

        let mut capabilities: Map<String, Value> = Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), Value::Object(chrome_options));

        let mut builder = ClientBuilder::rustls()
            .map_err(|e| ScoutError::Browser(format!("failed to initialise TLS connector: {e}")))?;
        builder.capabilities(capabilities);

        let client = builder.connect(&config.webdriver_url).await.map_err(|e| {
            ScoutError::Browser(format!(
                "failed to connect to WebDriver at {}: {e}. Is chromedriver running?",
                config.webdriver_url
            ))
        })?;

        tracing::info!(
            webdriver = %config.webdriver_url,
            headless = config.headless,
            "browser session started"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    type Element = Element;

    async fn goto(&self, url: &str) -> ScoutResult<()> {
        tracing::debug!(url, "navigating");
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> ScoutResult<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn find(&self, locator: &Locator) -> ScoutResult<Option<Element>> {
        let result = match locator {
            Locator::Id(id) => self.client.find(fantoccini::Locator::Id(id)).await,
            Locator::XPath(xpath) => self.client.find(fantoccini::Locator::XPath(xpath)).await,
            other => {
                let css = other.to_css().unwrap_or_default();
                self.client.find(fantoccini::Locator::Css(&css)).await
            }
        };

        match result {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_interactable(&self, element: &Element) -> ScoutResult<bool> {
        if !element.is_displayed().await? || !element.is_enabled().await? {
            return Ok(false);
        }
        let arg = serde_json::to_value(element)?;
        let unobscured = self.client.execute(UNOBSCURED_SCRIPT, vec![arg]).await?;
        Ok(unobscured.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &Element) -> ScoutResult<()> {
        element.click().await?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> ScoutResult<()> {
        element.clear().await?;
        Ok(())
    }

    async fn send_keys(&self, element: &Element, text: &str) -> ScoutResult<()> {
        element.send_keys(text).await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> ScoutResult<Value> {
        Ok(self.client.execute(script, vec![]).await?)
    }

    async fn screenshot(&self) -> ScoutResult<Vec<u8>> {
        Ok(self.client.screenshot().await?)
    }

    async fn shutdown(&self) -> ScoutResult<()> {
        self.client.clone().close().await?;
        tracing::info!("browser session closed");
        Ok(())
    }
}
