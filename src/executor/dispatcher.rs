use std::sync::atomic::{AtomicBool, Ordering};

use crate::agent_engine::state::{Action, ActionKind};
use crate::browser::driver::PageDriver;
use crate::browser::locator::{LocatorChain, LogicalTarget, TargetCatalog};
use crate::browser::resolver::{ElementResolver, ResolverConfig};
use crate::browser::wait::{poll_until, WaitConfig};
use crate::errors::{ScoutError, ScoutResult};
use crate::executor::input;
use crate::perception::screenshot::DiagnosticCapture;
use crate::perception::types::canonical_address;

/// Result of [`ActionExecutor::perform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub requested: ActionKind,
    pub performed: ActionKind,
    /// Set when the requested action failed and Skip ran instead.
    pub fallback_reason: Option<String>,
    /// False when not even the skip control could be clicked; the transition
    /// wait then decides whether the run can go on.
    pub clicked: bool,
}

impl ActionOutcome {
    fn completed(kind: ActionKind) -> Self {
        Self {
            requested: kind,
            performed: kind,
            fallback_reason: None,
            clicked: kind != ActionKind::AwaitNext,
        }
    }

    pub fn fell_back(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Performs page actions through the element resolver.
pub struct ActionExecutor<'a, D: PageDriver> {
    resolver: ElementResolver<'a, D>,
    catalog: &'a TargetCatalog,
    transition: WaitConfig,
    diagnostics: &'a DiagnosticCapture,
}

impl<'a, D: PageDriver> ActionExecutor<'a, D> {
    pub fn new(
        driver: &'a D,
        catalog: &'a TargetCatalog,
        resolver: ResolverConfig,
        transition: WaitConfig,
        diagnostics: &'a DiagnosticCapture,
    ) -> Self {
        Self {
            resolver: ElementResolver::new(driver, resolver, diagnostics),
            catalog,
            transition,
            diagnostics,
        }
    }

    fn chain(&self, target: LogicalTarget) -> LocatorChain {
        self.catalog.chain(target)
    }

    /// Runs `action`. Save and Send failures fall back to Skip and never
    /// error; only an `AwaitNext` whose page never advances is fatal.
    pub async fn perform(&self, action: &Action) -> ScoutResult<ActionOutcome> {
        let requested = action.kind();
        let attempt = match action {
            Action::Save => input::click_target(&self.resolver, &self.chain(LogicalTarget::SaveToFavorites)).await,
            Action::SendWithMessage(text) => self.send_with_message(text).await,
            Action::Skip => return Ok(self.skip(requested, None).await),
            Action::AwaitNext { from } => {
                self.await_next(from).await?;
                return Ok(ActionOutcome::completed(requested));
            }
        };

        Ok(match attempt {
            Ok(()) => ActionOutcome::completed(requested),
            Err(e) => {
                tracing::warn!(action = %requested, error = %e, "action failed, falling back to skip");
                self.skip(requested, Some(e.to_string())).await
            }
        })
    }

    /// Fill the message, then invite. A failure at either step is not retried.
    async fn send_with_message(&self, text: &str) -> ScoutResult<()> {
        input::type_text(&self.resolver, &self.chain(LogicalTarget::MessageInput), text, true).await?;
        input::click_target(&self.resolver, &self.chain(LogicalTarget::InviteToConnect)).await
    }

    async fn skip(&self, requested: ActionKind, reason: Option<String>) -> ActionOutcome {
        let clicked = match input::click_target(&self.resolver, &self.chain(LogicalTarget::SkipForNow)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "skip control unavailable, relying on page transition");
                false
            }
        };
        ActionOutcome {
            requested,
            performed: ActionKind::Skip,
            fallback_reason: reason,
            clicked,
        }
    }

    /// Waits until the page has left `from` and the next profile's content
    /// is present. Clicks "See next profile" once if it shows up meanwhile.
    /// Returns the new canonical address; a timeout is fatal.
    async fn await_next(&self, from: &str) -> ScoutResult<String> {
        let origin = canonical_address(from);
        let nudged = AtomicBool::new(false);
        let (origin_ref, nudged_ref) = (&origin, &nudged);

        let arrived = poll_until(self.transition, move || self.check_arrival(origin_ref, nudged_ref)).await?;

        match arrived {
            Some(next) => {
                tracing::debug!(from = %origin, to = %next, "page advanced");
                Ok(next)
            }
            None => {
                tracing::error!(
                    from = %origin,
                    waited_ms = self.transition.max_wait_ms,
                    "page did not advance"
                );
                let diagnostic = self.diagnostics.capture(self.resolver.driver(), "transition").await;
                Err(ScoutError::TransitionTimeout {
                    from: origin,
                    waited_ms: self.transition.max_wait_ms,
                    diagnostic,
                })
            }
        }
    }

    async fn check_arrival(&self, origin: &str, nudged: &AtomicBool) -> ScoutResult<Option<String>> {
        let driver = self.resolver.driver();
        let current = canonical_address(&driver.current_url().await?);
        if current != origin {
            if self.first_present(LogicalTarget::PageContent).await?.is_some() {
                return Ok(Some(current));
            }
            // Already moved on, content still loading.
            return Ok(None);
        }

        if !nudged.load(Ordering::Relaxed) {
            if let Some(button) = self.first_present(LogicalTarget::SeeNextProfile).await? {
                if driver.is_interactable(&button).await? {
                    nudged.store(true, Ordering::Relaxed);
                    match driver.click(&button).await {
                        Ok(()) => tracing::info!("clicked 'see next profile'"),
                        Err(e) => tracing::warn!(error = %e, "'see next profile' click failed"),
                    }
                }
            }
        }
        Ok(None)
    }

    /// Single non-waiting probe over a target's chain.
    async fn first_present(&self, target: LogicalTarget) -> ScoutResult<Option<D::Element>> {
        let driver = self.resolver.driver();
        for locator in &self.chain(target).locators {
            if let Some(element) = driver.find(locator).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::locator::Locator;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Page whose address changes when one of `advancing` is clicked.
    struct FakePage {
        url: Mutex<String>,
        present: Vec<Locator>,
        advancing: Vec<Locator>,
        clicks: Mutex<Vec<Locator>>,
        typed: Mutex<Vec<String>>,
    }

    impl FakePage {
        fn new(present: Vec<Locator>, advancing: Vec<Locator>) -> Self {
            Self {
                url: Mutex::new("https://example.test/candidate/1".into()),
                present,
                advancing,
                clicks: Mutex::new(Vec::new()),
                typed: Mutex::new(Vec::new()),
            }
        }

        fn clicks(&self) -> Vec<Locator> {
            self.clicks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        type Element = Locator;

        async fn goto(&self, url: &str) -> ScoutResult<()> {
            *self.url.lock().unwrap() = url.to_string();
            Ok(())
        }
        async fn current_url(&self) -> ScoutResult<String> {
            Ok(self.url.lock().unwrap().clone())
        }
        async fn find(&self, locator: &Locator) -> ScoutResult<Option<Locator>> {
            Ok(self.present.contains(locator).then(|| locator.clone()))
        }
        async fn is_interactable(&self, _element: &Locator) -> ScoutResult<bool> {
            Ok(true)
        }
        async fn click(&self, element: &Locator) -> ScoutResult<()> {
            self.clicks.lock().unwrap().push(element.clone());
            if self.advancing.contains(element) {
                *self.url.lock().unwrap() = "https://example.test/candidate/2".into();
            }
            Ok(())
        }
        async fn clear(&self, _element: &Locator) -> ScoutResult<()> {
            Ok(())
        }
        async fn send_keys(&self, _element: &Locator, text: &str) -> ScoutResult<()> {
            self.typed.lock().unwrap().push(text.to_string());
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

    fn locator(target: LogicalTarget) -> Locator {
        LocatorChain::builtin(target).locators[0].clone()
    }

    fn fast() -> ResolverConfig {
        ResolverConfig {
            probe: WaitConfig::new(0, 1),
            interactable: WaitConfig::new(0, 1),
        }
    }

    fn executor<'a>(
        page: &'a FakePage,
        catalog: &'a TargetCatalog,
        diagnostics: &'a DiagnosticCapture,
    ) -> ActionExecutor<'a, FakePage> {
        ActionExecutor::new(page, catalog, fast(), WaitConfig::new(30, 1), diagnostics)
    }

    #[tokio::test]
    async fn missing_save_control_falls_back_to_skip() {
        let skip = locator(LogicalTarget::SkipForNow);
        let page = FakePage::new(
            vec![skip.clone(), locator(LogicalTarget::PageContent)],
            vec![skip.clone()],
        );
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let outcome = exec.perform(&Action::Save).await.unwrap();

        assert_eq!(outcome.requested, ActionKind::Save);
        assert_eq!(outcome.performed, ActionKind::Skip);
        assert!(outcome.fell_back());
        assert!(outcome.clicked);
        assert_eq!(page.clicks(), vec![skip]);
        let next = exec.await_next("https://example.test/candidate/1").await.unwrap();
        assert_eq!(next, "https://example.test/candidate/2");
    }

    #[tokio::test]
    async fn await_next_action_waits_for_the_page_to_advance() {
        let page = FakePage::new(vec![locator(LogicalTarget::PageContent)], vec![]);
        *page.url.lock().unwrap() = "https://example.test/candidate/2".into();
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let outcome = exec
            .perform(&Action::AwaitNext {
                from: "https://example.test/candidate/1".into(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.performed, ActionKind::AwaitNext);
        assert!(!outcome.clicked);
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn await_next_action_on_stuck_page_is_an_error() {
        let page = FakePage::new(vec![locator(LogicalTarget::PageContent)], vec![]);
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let result = exec
            .perform(&Action::AwaitNext {
                from: "https://example.test/candidate/1".into(),
            })
            .await;

        assert!(matches!(result, Err(ScoutError::TransitionTimeout { .. })));
    }

    #[tokio::test]
    async fn send_types_message_then_invites() {
        let invite = locator(LogicalTarget::InviteToConnect);
        let page = FakePage::new(
            vec![locator(LogicalTarget::MessageInput), invite.clone()],
            vec![invite.clone()],
        );
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let outcome = exec
            .perform(&Action::SendWithMessage("Hi, fellow Rustacean".into()))
            .await
            .unwrap();

        assert_eq!(outcome.performed, ActionKind::SendWithMessage);
        assert!(!outcome.fell_back());
        assert_eq!(*page.typed.lock().unwrap(), vec!["Hi, fellow Rustacean".to_string()]);
        assert_eq!(page.clicks(), vec![invite]);
    }

    #[tokio::test]
    async fn send_without_invite_button_skips_instead() {
        let skip = locator(LogicalTarget::SkipForNow);
        let page = FakePage::new(vec![locator(LogicalTarget::MessageInput), skip.clone()], vec![]);
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let outcome = exec.perform(&Action::SendWithMessage("Hello".into())).await.unwrap();

        assert_eq!(outcome.performed, ActionKind::Skip);
        assert!(outcome.fallback_reason.unwrap().contains("invite to connect"));
        assert_eq!(page.clicks(), vec![skip]);
    }

    #[tokio::test]
    async fn see_next_profile_is_clicked_once_while_waiting() {
        let see_next = locator(LogicalTarget::SeeNextProfile);
        let page = FakePage::new(
            vec![see_next.clone(), locator(LogicalTarget::PageContent)],
            vec![see_next.clone()],
        );
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let next = exec.await_next("https://example.test/candidate/1").await.unwrap();

        assert_eq!(next, "https://example.test/candidate/2");
        assert_eq!(page.clicks(), vec![see_next]);
    }

    #[tokio::test]
    async fn see_next_profile_is_left_alone_once_the_address_changed() {
        let see_next = locator(LogicalTarget::SeeNextProfile);
        let page = FakePage::new(vec![see_next.clone()], vec![see_next]);
        *page.url.lock().unwrap() = "https://example.test/candidate/2".into();
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::disabled();
        let exec = executor(&page, &catalog, &diagnostics);

        let err = exec.await_next("https://example.test/candidate/1").await.unwrap_err();

        assert!(matches!(err, ScoutError::TransitionTimeout { .. }));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn stuck_page_is_a_fatal_timeout_with_capture() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![locator(LogicalTarget::PageContent)], vec![]);
        let catalog = TargetCatalog::builtin();
        let diagnostics = DiagnosticCapture::new(dir.path().to_path_buf());
        let exec = executor(&page, &catalog, &diagnostics);

        let err = exec
            .await_next("https://example.test/candidate/1#top")
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        match &err {
            ScoutError::TransitionTimeout { from, diagnostic, .. } => {
                assert_eq!(from, "https://example.test/candidate/1");
                assert!(diagnostic.as_ref().unwrap().exists());
            }
            other => panic!("expected transition timeout, got {other:?}"),
        }
    }
}
