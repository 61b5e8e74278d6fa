use crate::browser::driver::PageDriver;
use crate::browser::locator::{LocatorChain, LogicalTarget};
use crate::browser::wait::{poll_until, WaitConfig};
use crate::errors::{ScoutError, ScoutResult};
use crate::perception::screenshot::DiagnosticCapture;

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Budget for each locator in a chain.
    pub probe: WaitConfig,
    /// Budget for a resolved element to become interactable.
    pub interactable: WaitConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe: WaitConfig::new(3_000, 200),
            interactable: WaitConfig::new(10_000, 200),
        }
    }
}

/// First-match element lookup over a `LocatorChain`.
pub struct ElementResolver<'a, D: PageDriver> {
    driver: &'a D,
    config: ResolverConfig,
    diagnostics: &'a DiagnosticCapture,
}

impl<'a, D: PageDriver> ElementResolver<'a, D> {
    pub fn new(driver: &'a D, config: ResolverConfig, diagnostics: &'a DiagnosticCapture) -> Self {
        Self {
            driver,
            config,
            diagnostics,
        }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    /// Tries each locator in declared order, each within its own probe budget,
    /// and returns the first element found. Later locators are never probed
    /// once one matches. A locator whose lookup errors counts as a miss.
    pub async fn resolve(&self, chain: &LocatorChain) -> ScoutResult<D::Element> {
        let driver = self.driver;
        for (idx, locator) in chain.locators.iter().enumerate() {
            match poll_until(self.config.probe, move || driver.find(locator)).await {
                Ok(Some(element)) => {
                    tracing::debug!(
                        ui_target = %chain.target,
                        locator = %locator,
                        position = idx,
                        "element resolved"
                    );
                    return Ok(element);
                }
                Ok(None) => {
                    tracing::debug!(ui_target = %chain.target, locator = %locator, "locator missed");
                }
                Err(e) => {
                    tracing::warn!(
                        ui_target = %chain.target,
                        locator = %locator,
                        error = %e,
                        "locator lookup failed, trying next"
                    );
                }
            }
        }

        Err(self.resolution_failed(chain.target).await)
    }

    /// `resolve`, then block until the element can take input.
    pub async fn resolve_and_wait(&self, chain: &LocatorChain) -> ScoutResult<D::Element> {
        let element = self.resolve(chain).await?;
        let driver = self.driver;
        let candidate = &element;
        let ready = poll_until(self.config.interactable, move || async move {
            Ok::<_, ScoutError>(driver.is_interactable(candidate).await?.then_some(()))
        })
        .await?;

        match ready {
            Some(()) => Ok(element),
            None => {
                tracing::warn!(
                    ui_target = %chain.target,
                    waited_ms = self.config.interactable.max_wait_ms,
                    "element present but never became interactable"
                );
                Err(self.resolution_failed(chain.target).await)
            }
        }
    }

    async fn resolution_failed(&self, target: LogicalTarget) -> ScoutError {
        let diagnostic = if target.is_critical() {
            tracing::error!(ui_target = %target, "critical target not found, capturing page");
            self.diagnostics.capture(self.driver, target.key()).await
        } else {
            tracing::warn!(ui_target = %target, "target not found");
            None
        };
        ScoutError::Resolution { target, diagnostic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::locator::Locator;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Page where only the listed locators are present. Lookups of `failing`
    /// locators error out.
    struct StaticPage {
        present: Vec<Locator>,
        failing: Vec<Locator>,
        interactable: bool,
        probes: Mutex<Vec<Locator>>,
    }

    impl StaticPage {
        fn new(present: Vec<Locator>) -> Self {
            Self {
                present,
                failing: Vec::new(),
                interactable: true,
                probes: Mutex::new(Vec::new()),
            }
        }

        fn probed(&self) -> Vec<Locator> {
            self.probes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageDriver for StaticPage {
        type Element = Locator;

        async fn goto(&self, _url: &str) -> ScoutResult<()> {
            Ok(())
        }
        async fn current_url(&self) -> ScoutResult<String> {
            Ok("https://example.test/profile/1".into())
        }
        async fn find(&self, locator: &Locator) -> ScoutResult<Option<Locator>> {
            self.probes.lock().unwrap().push(locator.clone());
            if self.failing.contains(locator) {
                return Err(ScoutError::Browser("invalid selector".into()));
            }
            Ok(self.present.contains(locator).then(|| locator.clone()))
        }
        async fn is_interactable(&self, _element: &Locator) -> ScoutResult<bool> {
            Ok(self.interactable)
        }
        async fn click(&self, _element: &Locator) -> ScoutResult<()> {
            Ok(())
        }
        async fn clear(&self, _element: &Locator) -> ScoutResult<()> {
            Ok(())
        }
        async fn send_keys(&self, _element: &Locator, _text: &str) -> ScoutResult<()> {
            Ok(())
        }
        async fn execute_script(&self, _script: &str) -> ScoutResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        async fn screenshot(&self) -> ScoutResult<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
        async fn shutdown(&self) -> ScoutResult<()> {
            Ok(())
        }
    }

    fn fast() -> ResolverConfig {
        ResolverConfig {
            probe: WaitConfig::new(0, 1),
            interactable: WaitConfig::new(10, 1),
        }
    }

    #[tokio::test]
    async fn stops_at_first_matching_locator() {
        let a = Locator::id("a");
        let b = Locator::css(".b");
        let c = Locator::xpath("//c");
        let page = StaticPage::new(vec![b.clone(), c.clone()]);
        let diagnostics = DiagnosticCapture::disabled();
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);

        let chain = LocatorChain::new(LogicalTarget::SkipForNow, vec![a.clone(), b.clone(), c.clone()]);
        let found = resolver.resolve(&chain).await.unwrap();

        assert_eq!(found, b);
        let probed = page.probed();
        assert!(probed.contains(&a));
        assert!(!probed.contains(&c));
    }

    #[tokio::test]
    async fn erroring_locator_falls_through_to_next() {
        let bad = Locator::css("input[[bad");
        let good = Locator::name("password");
        let mut page = StaticPage::new(vec![good.clone()]);
        page.failing = vec![bad.clone()];
        let diagnostics = DiagnosticCapture::disabled();
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);

        let chain = LocatorChain::new(LogicalTarget::Password, vec![bad.clone(), good.clone()]);
        let found = resolver.resolve(&chain).await.unwrap();

        assert_eq!(found, good);
        assert_eq!(page.probed(), vec![bad, good]);
    }

    #[tokio::test]
    async fn chain_of_erroring_locators_is_a_resolution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bad = Locator::css("input[[bad");
        let mut page = StaticPage::new(vec![]);
        page.failing = vec![bad.clone()];
        let diagnostics = DiagnosticCapture::new(dir.path().to_path_buf());
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);

        let chain = LocatorChain::new(LogicalTarget::Password, vec![bad]);
        match resolver.resolve(&chain).await {
            Err(ScoutError::Resolution { target, diagnostic }) => {
                assert_eq!(target, LogicalTarget::Password);
                assert!(diagnostic.unwrap().exists());
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_chain_reports_target() {
        let page = StaticPage::new(vec![]);
        let diagnostics = DiagnosticCapture::disabled();
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);
        let chain = LocatorChain::builtin(LogicalTarget::SaveToFavorites);

        match resolver.resolve(&chain).await {
            Err(ScoutError::Resolution { target, diagnostic }) => {
                assert_eq!(target, LogicalTarget::SaveToFavorites);
                assert!(diagnostic.is_none());
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn critical_target_failure_writes_capture() {
        let dir = tempfile::tempdir().unwrap();
        let page = StaticPage::new(vec![]);
        let diagnostics = DiagnosticCapture::new(dir.path().to_path_buf());
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);
        let chain = LocatorChain::builtin(LogicalTarget::Username);

        let err = resolver.resolve(&chain).await.unwrap_err();
        let path = err.diagnostic().cloned().expect("diagnostic path");
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn element_that_never_becomes_interactable_fails() {
        let mut page = StaticPage::new(vec![Locator::tag("textarea")]);
        page.interactable = false;
        let diagnostics = DiagnosticCapture::disabled();
        let resolver = ElementResolver::new(&page, fast(), &diagnostics);
        let chain = LocatorChain::builtin(LogicalTarget::MessageInput);

        assert!(resolver.resolve(&chain).await.is_ok());
        assert!(matches!(
            resolver.resolve_and_wait(&chain).await,
            Err(ScoutError::Resolution { target: LogicalTarget::MessageInput, .. })
        ));
    }
}
