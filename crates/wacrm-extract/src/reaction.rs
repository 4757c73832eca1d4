//! Turns page events into debounced extraction cycles.

use crate::dom;
use crate::orchestrator::{CycleOutcome, Orchestrator};
use crate::page::HostPage;
use scraper::Selector;
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;
use wacrm_core::TriggerReason;

static CONVERSATION_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[data-testid="cell-frame-container"], [role="listitem"], [role="row"], [data-id*="@c.us"], div[role="row"][aria-selected="true"]"#,
    )
    .expect("Failed to parse conversation row selector - this is a bug")
});

static HEADER_REGION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"#main header, [data-testid="conversation-header"], [data-testid="conversation-info-header"]"#,
    )
    .expect("Failed to parse header region selector - this is a bug")
});

/// A page event. Targets are CSS selectors naming the event's node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Click { target: String },
    HashChange,
    Mutation { target: String },
}

pub struct ChangeReactor {
    orchestrator: Rc<Orchestrator>,
    page: Rc<dyn HostPage>,
}

impl ChangeReactor {
    pub fn new(orchestrator: Rc<Orchestrator>, page: Rc<dyn HostPage>) -> Self {
        Self { orchestrator, page }
    }

    pub fn orchestrator(&self) -> &Rc<Orchestrator> {
        &self.orchestrator
    }

    /// Whether `trigger` should start a cycle, and after which delay.
    pub fn accepts(&self, trigger: &Trigger) -> Option<(TriggerReason, Duration)> {
        let extraction = &self.orchestrator.config().extraction;
        match trigger {
            Trigger::HashChange => Some((TriggerReason::HashChange, extraction.debounce)),
            Trigger::Click { target } => self
                .target_inside(target, &CONVERSATION_ROWS)
                .then_some((TriggerReason::Click, extraction.debounce)),
            Trigger::Mutation { target } => self
                .target_inside(target, &HEADER_REGION)
                .then_some((TriggerReason::Mutation, extraction.mutation_debounce)),
        }
    }

    fn target_inside(&self, target: &str, region: &Selector) -> bool {
        let selector = match dom::compile(target) {
            Ok(selector) => selector,
            Err(err) => {
                debug!(error = %err, "ignoring trigger with bad target");
                return false;
            }
        };
        let snapshot = self.page.snapshot();
        snapshot
            .select_first(&selector)
            .is_some_and(|el| dom::is_inside(el, region))
    }

    /// Schedules a cycle for an accepted trigger on the current `LocalSet`.
    /// Must be called from within one.
    pub fn handle(&self, trigger: &Trigger) -> Option<JoinHandle<CycleOutcome>> {
        let Some((reason, delay)) = self.accepts(trigger) else {
            debug!(?trigger, "trigger ignored");
            return None;
        };
        debug!(%reason, delay_ms = delay.as_millis() as u64, "scheduling cycle");
        let orchestrator = Rc::clone(&self.orchestrator);
        Some(tokio::task::spawn_local(async move {
            sleep(delay).await;
            orchestrator.run_cycle(reason).await
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeReactor, Trigger};
    use crate::notify::MemoryNotifier;
    use crate::orchestrator::{CycleOutcome, Orchestrator};
    use crate::page::ScriptedPage;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::task::LocalSet;
    use wacrm_config::AppConfig;
    use wacrm_core::TriggerReason;

    const PAGE: &str = r#"<div id="pane-side">
        <div role="row" id="row-a"><span id="name-a">Alice</span></div>
        <div id="search"><span id="search-box">search</span></div>
    </div>
    <div id="main">
        <header><span id="subtitle">online</span></header>
        <div id="msg" data-id="true_8801722626327@c.us_A">hi</div>
    </div>"#;

    fn reactor() -> ChangeReactor {
        let page = Rc::new(ScriptedPage::new(PAGE));
        let orchestrator = Rc::new(Orchestrator::new(
            AppConfig::default(),
            page.clone(),
            Rc::new(MemoryNotifier::new()),
        ));
        ChangeReactor::new(orchestrator, page)
    }

    #[test]
    fn clicks_only_count_inside_chat_rows() {
        let reactor = reactor();
        let accepted = reactor.accepts(&Trigger::Click {
            target: "#name-a".into(),
        });
        assert_eq!(accepted, Some((TriggerReason::Click, Duration::from_millis(130))));
        assert!(reactor
            .accepts(&Trigger::Click {
                target: "#search-box".into()
            })
            .is_none());
        assert!(reactor
            .accepts(&Trigger::Click {
                target: "#missing".into()
            })
            .is_none());
        assert!(reactor
            .accepts(&Trigger::Click { target: "[".into() })
            .is_none());
    }

    #[test]
    fn mutations_only_count_inside_header() {
        let reactor = reactor();
        assert_eq!(
            reactor.accepts(&Trigger::Mutation {
                target: "#subtitle".into()
            }),
            Some((TriggerReason::Mutation, Duration::from_millis(150)))
        );
        assert!(reactor
            .accepts(&Trigger::Mutation {
                target: "#msg".into()
            })
            .is_none());
        assert_eq!(
            reactor.accepts(&Trigger::HashChange),
            Some((TriggerReason::HashChange, Duration::from_millis(130)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_triggers_notify_once() {
        let reactor = reactor();
        LocalSet::new()
            .run_until(async {
                let first = reactor.handle(&Trigger::HashChange).expect("scheduled");
                assert!(matches!(first.await.expect("join"), CycleOutcome::Emitted(_)));

                let second = reactor
                    .handle(&Trigger::Mutation {
                        target: "#subtitle".into(),
                    })
                    .expect("scheduled");
                let last = reactor.orchestrator().last_emitted().expect("last");
                assert_eq!(second.await.expect("join"), CycleOutcome::Duplicate(last));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_cycle_is_dropped() {
        let page = Rc::new(ScriptedPage::new(
            r#"<div id="main"><header><span id="subtitle">online</span></header></div>"#,
        ));
        let orchestrator = Rc::new(Orchestrator::new(
            AppConfig::default(),
            page.clone(),
            Rc::new(MemoryNotifier::new()),
        ));
        let reactor = ChangeReactor::new(orchestrator, page);

        LocalSet::new()
            .run_until(async {
                let first = reactor.handle(&Trigger::HashChange).expect("scheduled");
                let second = reactor
                    .handle(&Trigger::Mutation {
                        target: "#subtitle".into(),
                    })
                    .expect("scheduled");
                assert_eq!(second.await.expect("join"), CycleOutcome::Skipped);
                assert_eq!(first.await.expect("join"), CycleOutcome::NotFound);
                assert!(!reactor.orchestrator().is_in_flight());
            })
            .await;
    }
}
