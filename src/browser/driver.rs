use async_trait::async_trait;

use crate::browser::locator::Locator;
use crate::errors::ScoutResult;

/// The page operations the review loop needs from a browser session.
/// The WebDriver-backed implementation lives in `browser::webdriver`; tests
/// drive the loop through in-memory implementations.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Send + Sync;

    async fn goto(&self, url: &str) -> ScoutResult<()>;

    async fn current_url(&self) -> ScoutResult<String>;

    /// Single presence probe. `Ok(None)` means "not on the page right now".
    async fn find(&self, locator: &Locator) -> ScoutResult<Option<Self::Element>>;

    /// Visible, enabled and not covered by another element.
    async fn is_interactable(&self, element: &Self::Element) -> ScoutResult<bool>;

    async fn click(&self, element: &Self::Element) -> ScoutResult<()>;

    async fn clear(&self, element: &Self::Element) -> ScoutResult<()>;

    async fn send_keys(&self, element: &Self::Element, text: &str) -> ScoutResult<()>;

    async fn execute_script(&self, script: &str) -> ScoutResult<serde_json::Value>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> ScoutResult<Vec<u8>>;

    async fn shutdown(&self) -> ScoutResult<()>;
}
