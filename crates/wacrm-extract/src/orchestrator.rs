//! Runs the fallback chains and hands fresh identifiers downstream.

use crate::dom;
use crate::drawer::{DrawerController, DrawerCopyableStrategy, DrawerStrategy};
use crate::extractors::{page_strategy, ExtractionContext, Strategy};
use crate::notify::Notifier;
use crate::page::HostPage;
use scraper::Selector;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::LazyLock;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use wacrm_config::AppConfig;
use wacrm_core::{CandidateSource, CycleId, Emission, Identifier, SuffixDedup, TriggerReason};

static MAIN_AREA: LazyLock<Vec<Selector>> =
    LazyLock::new(|| dom::compile_all(&["#main", r#"[data-testid="conversation-panel"]"#]));

static MASKED_MARKERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"#main [data-id*="@lid_"], #main [data-jid*="@lid_"], [aria-selected="true"] [data-id*="@lid_"], [aria-selected="true"] [data-jid*="@lid_"]"#,
    )
    .expect("Failed to parse masked marker selector - this is a bug")
});

/// What one triggered cycle ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Emitted(Emission),
    /// Same contact as the last emission; nothing sent downstream.
    Duplicate(Identifier),
    NotFound,
    /// Another cycle was still running.
    Skipped,
}

type Chain = Vec<Box<dyn Strategy>>;

fn build_chain(sources: &[CandidateSource]) -> Chain {
    sources.iter().copied().filter_map(page_strategy).collect()
}

struct FlightGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// One per session: owns the fallback chains, the drawer controller, the
/// in-flight flag and the last emitted identifier.
pub struct Orchestrator {
    config: Rc<AppConfig>,
    page: Rc<dyn HostPage>,
    drawer: Rc<DrawerController>,
    quick: Chain,
    masked_quick: Chain,
    masked_fallback: Chain,
    drawer_stages: Chain,
    notifier: Rc<dyn Notifier>,
    in_flight: Cell<bool>,
    last: RefCell<SuffixDedup>,
}

impl Orchestrator {
    pub fn new(config: AppConfig, page: Rc<dyn HostPage>, notifier: Rc<dyn Notifier>) -> Self {
        let drawer = Rc::new(DrawerController::new(&config));
        let drawer_stages: Chain = vec![
            Box::new(DrawerStrategy::new(Rc::clone(&drawer))),
            Box::new(DrawerCopyableStrategy::new(Rc::clone(&drawer))),
        ];
        Self {
            quick: build_chain(&config.chains.quick),
            masked_quick: build_chain(&config.chains.masked_quick),
            masked_fallback: build_chain(&config.chains.masked_fallback),
            drawer_stages,
            last: RefCell::new(SuffixDedup::new(config.extraction.dedup_suffix_len)),
            config: Rc::new(config),
            page,
            drawer,
            notifier,
            in_flight: Cell::new(false),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn drawer(&self) -> &DrawerController {
        &self.drawer
    }

    pub fn last_emitted(&self) -> Option<Identifier> {
        self.last.borrow().last().cloned()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// The active conversation's phone number, or `None` when every
    /// strategy came up empty or a cycle is already running. Never errors.
    pub async fn extract_current_identifier(&self) -> Option<Identifier> {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            debug!("cycle already in flight, not extracting");
            return None;
        };
        self.extract().await.map(|(identifier, _)| identifier)
    }

    /// One triggered cycle: extract, de-duplicate, notify.
    pub async fn run_cycle(&self, reason: TriggerReason) -> CycleOutcome {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            debug!(%reason, "cycle already in flight, dropping trigger");
            return CycleOutcome::Skipped;
        };
        let cycle = CycleId::new();
        let span = info_span!("extraction_cycle", cycle = %cycle, %reason);
        self.cycle(cycle, reason).instrument(span).await
    }

    async fn cycle(&self, cycle: CycleId, reason: TriggerReason) -> CycleOutcome {
        let Some((identifier, source)) = self.extract().await else {
            return CycleOutcome::NotFound;
        };

        if !self.last.borrow_mut().observe(&identifier) {
            debug!(identifier = %identifier, "same contact as last emission");
            return CycleOutcome::Duplicate(identifier);
        }

        let emission = Emission::new(
            cycle,
            reason,
            identifier,
            source,
            self.config.extraction.dedup_suffix_len,
        );
        if let Err(err) = self.notifier.notify(&emission) {
            warn!(error = %err, "failed to notify");
        }
        CycleOutcome::Emitted(emission)
    }

    async fn extract(&self) -> Option<(Identifier, CandidateSource)> {
        self.wait_for_main_area().await;

        let ctx = ExtractionContext {
            page: Rc::clone(&self.page),
            config: Rc::clone(&self.config),
            masked: self.has_masked_context(),
            drawer_open: self.drawer.probe(self.page.as_ref()),
        };
        debug!(masked = ctx.masked, drawer_open = ctx.drawer_open, "extraction context");

        let found = if ctx.masked {
            self.extract_masked(&ctx).await
        } else {
            self.extract_unmasked(&ctx).await
        };
        if found.is_none() {
            info!("no identifier found");
        }
        found
    }

    async fn extract_masked(&self, ctx: &ExtractionContext) -> Option<(Identifier, CandidateSource)> {
        if let Some(found) = self.run_chain(&self.masked_quick, ctx).await {
            return Some(found);
        }
        if let Some(found) = self.run_chain(&self.drawer_stages[..1], ctx).await {
            return Some(found);
        }
        self.run_chain(&self.masked_fallback, ctx).await
    }

    async fn extract_unmasked(&self, ctx: &ExtractionContext) -> Option<(Identifier, CandidateSource)> {
        if let Some(found) = self.run_chain(&self.quick, ctx).await {
            return Some(found);
        }

        let deadline = Instant::now() + self.config.extraction.settle;
        while Instant::now() < deadline {
            sleep(self.config.extraction.settle_poll).await;
            if let Some(found) = self.run_chain(&self.quick, ctx).await {
                return Some(found);
            }
        }

        self.run_chain(&self.drawer_stages, ctx).await
    }

    async fn run_chain(
        &self,
        chain: &[Box<dyn Strategy>],
        ctx: &ExtractionContext,
    ) -> Option<(Identifier, CandidateSource)> {
        for strategy in chain {
            let Some(candidate) = strategy.attempt(ctx).await else {
                continue;
            };
            let source = candidate.source();
            match candidate.into_identifier(ctx.min_digits()) {
                Ok(identifier) => {
                    info!(path = strategy.name(), identifier = %identifier, "identifier found");
                    return Some((identifier, source));
                }
                Err(err) => debug!(path = strategy.name(), error = %err, "candidate rejected"),
            }
        }
        None
    }

    /// Waits for the conversation pane, bounded; extraction proceeds
    /// either way.
    async fn wait_for_main_area(&self) -> bool {
        let started = Instant::now();
        loop {
            let snapshot = self.page.snapshot();
            if snapshot.first_visible_of(&MAIN_AREA).is_some() {
                return true;
            }
            if started.elapsed() >= self.config.extraction.main_area_wait {
                debug!(
                    waited_ms = self.config.extraction.main_area_wait.as_millis() as u64,
                    "main area not ready"
                );
                return false;
            }
            sleep(self.config.extraction.main_area_poll).await;
        }
    }

    /// Masked (LID) conversations never expose the number in attributes.
    fn has_masked_context(&self) -> bool {
        self.page.snapshot().select_first(&MASKED_MARKERS).is_some()
    }
}
