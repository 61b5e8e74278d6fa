use std::sync::Arc;

use crate::agent_engine::loop_control::LoopController;
use crate::agent_engine::state::{Action, LoopState, RunSummary, Session};
use crate::browser::driver::PageDriver;
use crate::browser::locator::{LogicalTarget, TargetCatalog};
use crate::browser::resolver::{ElementResolver, ResolverConfig};
use crate::browser::wait::WaitConfig;
use crate::config::{AppConfig, Credentials, RunConfig, TimeoutConfig};
use crate::errors::{ScoutError, ScoutResult};
use crate::executor::dispatcher::ActionExecutor;
use crate::executor::input;
use crate::llm::decision::{normalize, Decision};
use crate::llm::prompt::Criteria;
use crate::llm::provider::VisionProvider;
use crate::llm::types::EvaluationRequest;
use crate::perception::screenshot::{DiagnosticCapture, SnapshotStore};
use crate::perception::types::canonical_address;

/// Drives one review run over a single browser session: capture, evaluate,
/// decide, act, advance, until the budget of distinct profiles is spent.
pub struct ReviewEngine<'a, D: PageDriver> {
    driver: &'a D,
    provider: Arc<dyn VisionProvider>,
    criteria: Criteria,
    catalog: TargetCatalog,
    snapshots: SnapshotStore,
    diagnostics: DiagnosticCapture,
    run: RunConfig,
    timeouts: TimeoutConfig,

    state: LoopState,
    session: Session,
    loop_ctrl: LoopController,
    summary: RunSummary,
}

impl<'a, D: PageDriver> ReviewEngine<'a, D> {
    pub fn new(
        driver: &'a D,
        provider: Arc<dyn VisionProvider>,
        criteria: Criteria,
        config: &AppConfig,
    ) -> ScoutResult<Self> {
        let catalog = TargetCatalog::with_overrides(&config.selectors)?;
        let session = Session::new(config.run.budget);
        let summary = RunSummary::new(&session.id);
        Ok(Self {
            driver,
            provider,
            criteria,
            catalog,
            snapshots: SnapshotStore::new(
                config.paths.snapshot_dir.clone(),
                config.paths.archive_dir.clone(),
            ),
            diagnostics: DiagnosticCapture::new(config.paths.diagnostics_dir.clone()),
            run: config.run.clone(),
            timeouts: config.timeouts.clone(),
            state: LoopState::Idle,
            session,
            loop_ctrl: LoopController::new(config.run.max_consecutive_revisits),
            summary,
        })
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn executor(&self) -> ActionExecutor<'_, D> {
        ActionExecutor::new(
            self.driver,
            &self.catalog,
            self.timeouts.resolver(),
            self.timeouts.transition(),
            &self.diagnostics,
        )
    }

    /// Opens the start page and signs in. Every target here is critical: a
    /// miss captures the page and ends the run.
    pub async fn login(&self, credentials: &Credentials) -> ScoutResult<()> {
        tracing::info!(url = %self.run.start_url, "opening start page");
        self.driver.goto(&self.run.start_url).await?;

        let page_load = ResolverConfig {
            probe: self.timeouts.login(),
            interactable: WaitConfig::new(0, self.timeouts.poll_interval_ms),
        };
        let slow = ElementResolver::new(self.driver, page_load, &self.diagnostics);
        slow.resolve(&self.catalog.chain(LogicalTarget::Body)).await?;

        let resolver = ElementResolver::new(self.driver, self.timeouts.resolver(), &self.diagnostics);
        input::type_text(
            &resolver,
            &self.catalog.chain(LogicalTarget::Username),
            &credentials.username,
            true,
        )
        .await?;
        input::type_text(
            &resolver,
            &self.catalog.chain(LogicalTarget::Password),
            &credentials.password,
            true,
        )
        .await?;
        input::click_target(&resolver, &self.catalog.chain(LogicalTarget::LoginSubmit)).await?;

        slow.resolve(&self.catalog.chain(LogicalTarget::PageContent)).await?;
        tracing::info!("logged in");
        Ok(())
    }

    /// Runs the loop to completion. On any exit the current snapshot is
    /// released and the state is `Terminated`.
    pub async fn run_loop(&mut self) -> ScoutResult<RunSummary> {
        tracing::info!(
            session = %self.session.id,
            budget = self.session.budget,
            provider = %self.provider.name(),
            model = %self.provider.model(),
            "review loop started"
        );

        let result = self.drive().await;
        self.session.current = None;
        self.state = LoopState::Terminated;
        self.summary.processed = self.session.processed();

        match result {
            Ok(()) => {
                tracing::info!(
                    session = %self.session.id,
                    processed = self.summary.processed,
                    saved = self.summary.saved,
                    sent = self.summary.sent,
                    skipped = self.summary.skipped,
                    "review loop finished"
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                tracing::error!(session = %self.session.id, error = %e, "review loop aborted");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> ScoutResult<()> {
        loop {
            match self.state.clone() {
                // ── Idle: budget check, then identify the page ────────────
                LoopState::Idle => {
                    if self.loop_ctrl.should_stop(&self.session) {
                        tracing::info!(processed = self.session.processed(), "budget reached");
                        self.state = LoopState::Terminated;
                        continue;
                    }

                    let key = canonical_address(&self.driver.current_url().await?);
                    if self.session.record_visit(&key) {
                        self.loop_ctrl.record_new();
                        tracing::info!(
                            key = %key,
                            n = self.session.processed(),
                            budget = self.session.budget,
                            "new profile"
                        );
                        self.state = LoopState::Capturing { key };
                    } else {
                        self.summary.revisits += 1;
                        self.loop_ctrl.record_revisit()?;
                        tracing::warn!(key = %key, "address already processed, skipping without evaluation");
                        self.executor().perform(&Action::Skip).await?;
                        self.state = LoopState::Advancing { from: key };
                    }
                }

                // ── Capturing: fit the page, then snapshot it ─────────────
                LoopState::Capturing { key } => {
                    self.apply_zoom().await;
                    let view = self.snapshots.capture(self.driver, &key).await?;
                    self.session.current = Some(view);
                    self.state = LoopState::Evaluating;
                }

                LoopState::Evaluating => {
                    let decision = self.evaluate().await;
                    self.state = LoopState::Deciding { decision };
                }

                LoopState::Deciding { decision } => {
                    let action = Action::from_decision(&decision);
                    if matches!(action, Action::SendWithMessage(_)) {
                        self.archive_current().await;
                    }
                    self.state = LoopState::Acting { action };
                }

                // ── Acting: execute, then release the snapshot ────────────
                LoopState::Acting { action } => {
                    let outcome = self.executor().perform(&action).await?;
                    self.summary.record_action(outcome.performed, outcome.fell_back());

                    let from = match self.session.current.take() {
                        Some(view) => view.key.clone(),
                        None => canonical_address(&self.driver.current_url().await?),
                    };
                    match &outcome.fallback_reason {
                        Some(reason) => tracing::info!(
                            key = %from,
                            action = %outcome.requested,
                            performed = %outcome.performed,
                            clicked = outcome.clicked,
                            reason = %reason,
                            "profile handled with fallback"
                        ),
                        None => tracing::info!(
                            key = %from,
                            action = %outcome.performed,
                            clicked = outcome.clicked,
                            "profile handled"
                        ),
                    }
                    self.state = LoopState::Advancing { from };
                }

                LoopState::Advancing { from } => {
                    self.executor().perform(&Action::AwaitNext { from }).await?;
                    self.state = LoopState::Idle;
                }

                LoopState::Terminated => return Ok(()),
            }

            tokio::task::yield_now().await;
        }
    }

    /// Zoom out so the whole profile fits in one screenshot. Best effort.
    async fn apply_zoom(&self) {
        let script = format!("document.body.style.zoom='{}%'", self.run.zoom_percent);
        if let Err(e) = self.driver.execute_script(&script).await {
            tracing::warn!(error = %e, zoom = self.run.zoom_percent, "could not apply page zoom");
        }
    }

    /// Any failure degrades to a negative decision; one bad response never
    /// stops the run.
    async fn evaluate(&mut self) -> Decision {
        let Some(view) = self.session.current.as_ref() else {
            return Decision::rejected();
        };
        let request = EvaluationRequest {
            prompt: self.run.prompt.clone(),
            images: vec![view.snapshot_path().to_path_buf()],
        };

        let result: ScoutResult<Decision> = async {
            let payload = self.provider.build_request(&request, &self.criteria)?;
            let raw = self.provider.invoke(payload).await?;
            normalize(&raw)
        }
        .await;

        match result {
            Ok(decision) => {
                tracing::debug!(
                    good_fit = decision.is_good_fit,
                    has_message = !decision.intro_message.is_empty(),
                    "decision normalized"
                );
                decision
            }
            Err(e) => {
                self.summary.degraded_evaluations += 1;
                let kind = match &e {
                    ScoutError::ProviderInvocation { .. } => "provider",
                    ScoutError::DecisionParse(_) => "parse",
                    _ => "request",
                };
                tracing::warn!(error = %e, kind, "evaluation failed, treating profile as not a fit");
                Decision::rejected()
            }
        }
    }

    async fn archive_current(&mut self) {
        let Some(view) = self.session.current.as_ref() else {
            return;
        };
        match self.snapshots.archive(view).await {
            Ok(path) => self.summary.archived.push(path),
            Err(e) => tracing::warn!(key = %view.key, error = %e, "could not archive snapshot"),
        }
    }
}
