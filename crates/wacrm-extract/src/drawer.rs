//! The contact-info drawer.
//!
//! Opening the drawer is the only place the engine writes to the page: it
//! sends a synthetic click to the contact name or avatar and polls until
//! the drawer renders. The controller owns the drawer's state for the
//! session.

use crate::dom;
use crate::extractors::{has_digit_or_plus, scannable, ExtractionContext, Strategy};
use crate::page::{HostPage, PageSnapshot, PointerEvent};
use crate::visibility::is_visible;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::LazyLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use wacrm_config::{AppConfig, DrawerConfig};
use wacrm_core::{Candidate, CandidateSource, DrawerClosePolicy, MatchPolicy, NumberPlan};

/// Ancestors inspected when widening a detected drawer to its panel.
const MAX_ROOT_HOPS: usize = 8;

static CLICK_TARGETS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"[data-testid="conversation-info-header"]"#,
        r#"#main header [data-testid="conversation-info-header-chat-title"]"#,
        r#"#main header span[data-testid="conversation-info-header-chat-title"]"#,
        r#"#main header [data-testid="default-user"]"#,
        r#"#main header img[draggable="false"]"#,
        r#"#main header [role="button"]:first-of-type"#,
        "#main header",
    ])
});

static HEADER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#main header").expect("Failed to parse header selector - this is a bug")
});

static EXPANDED_SECTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("section.x1c4vz4f.x2lah0s")
        .expect("Failed to parse drawer section selector - this is a bug")
});

static EXPANDED_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div._aig-._as6h.x1c4vz4f.x2lah0s")
        .expect("Failed to parse drawer container selector - this is a bug")
});

static SECTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("section").expect("Failed to parse section selector - this is a bug")
});

static HEADER_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("header h2").expect("Failed to parse header title selector - this is a bug")
});

static COPYABLE_AREA: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.copyable-area").expect("Failed to parse copyable area selector - this is a bug")
});

static AREA_SUBTITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.x1evy7pa.x1anpbxc").expect("Failed to parse subtitle selector - this is a bug")
});

static AREA_CLOSE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"button[aria-label="Close"]"#)
        .expect("Failed to parse close button selector - this is a bug")
});

static LEGACY_DRAWERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"[data-testid="conversation-info-drawer"]"#,
        r#"[data-testid="contact-info"]"#,
        r#"div[role="dialog"][data-animate-modal="true"]"#,
        r#"aside[aria-label], [role="region"][aria-label]"#,
    ])
});

static DRAWER_COPYABLE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"span.copyable-text[data-testid="selectable-text"]"#,
        r#"[data-testid="selectable-text"].copyable-text"#,
        "span.copyable-text",
        ".copyable-text",
    ])
});

static CLOSE_CONTROLS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"button[aria-label="Close"]"#,
        r#"[role="button"][aria-label="Close"]"#,
        r#"button[aria-label="Back"]"#,
        r#"[data-icon="x"]"#,
        r#"[data-icon="close"]"#,
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerState {
    Unknown,
    Closed,
    Opening,
    Open,
}

/// How long to wait for the drawer after clicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Normal,
    /// Masked conversations render the drawer noticeably slower.
    Aggressive,
}

impl Budget {
    pub fn for_context(masked: bool) -> Self {
        if masked {
            Budget::Aggressive
        } else {
            Budget::Normal
        }
    }
}

/// The node proving the drawer is open, if any.
pub fn detect_drawer(snapshot: &PageSnapshot) -> Option<ElementRef<'_>> {
    if let Some(section) = snapshot
        .select_first(&EXPANDED_SECTION)
        .filter(|el| is_visible(snapshot, *el))
    {
        debug!("drawer detected via expanded section");
        return Some(section);
    }

    if let Some(container) = snapshot
        .select_first(&EXPANDED_CONTAINER)
        .filter(|el| is_visible(snapshot, *el))
    {
        debug!("drawer detected via expanded container");
        let inner = dom::select_within(container, &SECTION).into_iter().next();
        return Some(inner.unwrap_or(container));
    }

    if let Some(title) = snapshot.select_first(&HEADER_TITLE) {
        if dom::text_content(title).to_lowercase().contains("contact info") {
            let section = dom::closest(title, &SECTION).or_else(|| {
                dom::closest(title, &COPYABLE_AREA)
                    .and_then(|area| dom::select_within(area, &SECTION).into_iter().next())
            });
            if let Some(section) = section.filter(|el| is_visible(snapshot, *el)) {
                debug!("drawer detected via contact info title");
                return Some(section);
            }
        }
    }

    let area = snapshot.select_all(&COPYABLE_AREA).into_iter().find(|area| {
        !dom::select_within(*area, &AREA_SUBTITLE).is_empty()
            && !dom::select_within(*area, &AREA_CLOSE).is_empty()
            && is_visible(snapshot, *area)
    });
    if area.is_some() {
        debug!("drawer detected via copyable area");
        return area;
    }

    let legacy = snapshot
        .first_of(&LEGACY_DRAWERS)
        .filter(|el| is_visible(snapshot, *el));
    if legacy.is_some() {
        debug!("drawer detected via legacy selector");
    }
    legacy
}

/// Widens a detected drawer node to its enclosing panel: the first
/// `aside`, region or dialog within [`MAX_ROOT_HOPS`] ancestors, never the
/// document body.
pub fn extraction_root(detected: ElementRef<'_>) -> ElementRef<'_> {
    let mut root = detected;
    for _ in 0..MAX_ROOT_HOPS {
        let Some(parent) = root.parent().and_then(ElementRef::wrap) else {
            break;
        };
        let value = parent.value();
        if matches!(value.name(), "body" | "html") {
            break;
        }
        root = parent;
        if value.name() == "aside" || matches!(value.attr("role"), Some("region" | "dialog")) {
            break;
        }
    }
    root
}

/// Reads a national mobile number out of an open drawer. Copyable spans
/// win outright; otherwise `text_match` picks among every number in view.
pub fn read_drawer(
    snapshot: &PageSnapshot,
    detected: ElementRef<'_>,
    plan: &NumberPlan,
    text_match: MatchPolicy,
) -> Option<String> {
    let root = extraction_root(detected);
    debug!(root = %dom::describe(root), "scanning drawer");

    let copyable = DRAWER_COPYABLE.iter().find_map(|selector| {
        dom::select_within(root, selector)
            .into_iter()
            .filter(|el| is_visible(snapshot, *el))
            .find_map(|el| {
                let text = dom::visible_text(snapshot, el);
                let text = scannable(&text)?;
                plan.find_mobiles(text).into_iter().next()
            })
    });
    if copyable.is_some() {
        return copyable;
    }

    let walked = dom::text_nodes(root)
        .into_iter()
        .filter(|(parent, _)| is_visible(snapshot, *parent))
        .filter_map(|(_, text)| scannable(text).filter(|text| has_digit_or_plus(text)))
        .flat_map(|text| plan.find_mobiles(text));
    text_match.pick(walked)
}

pub struct DrawerController {
    config: DrawerConfig,
    plan: NumberPlan,
    state: Cell<DrawerState>,
}

impl DrawerController {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.drawer.clone(),
            plan: config.number_plan.clone(),
            state: Cell::new(DrawerState::Unknown),
        }
    }

    pub fn state(&self) -> DrawerState {
        self.state.get()
    }

    fn attempts(&self, budget: Budget) -> u32 {
        match budget {
            Budget::Normal => self.config.normal_attempts,
            Budget::Aggressive => self.config.aggressive_attempts,
        }
    }

    /// Checks whether the drawer is open right now.
    pub fn probe(&self, page: &dyn HostPage) -> bool {
        let snapshot = page.snapshot();
        let open = detect_drawer(&snapshot).is_some();
        if self.state.get() != DrawerState::Opening {
            self.state
                .set(if open { DrawerState::Open } else { DrawerState::Closed });
        }
        open
    }

    /// Reads an already-open drawer without touching the page.
    pub fn read_open(&self, page: &dyn HostPage) -> Option<String> {
        let snapshot = page.snapshot();
        let Some(detected) = detect_drawer(&snapshot) else {
            debug!("drawer not open");
            self.state.set(DrawerState::Closed);
            return None;
        };
        self.state.set(DrawerState::Open);
        read_drawer(&snapshot, detected, &self.plan, self.config.text_match)
    }

    /// Opens the drawer when needed and reads it.
    pub async fn extract(&self, page: &dyn HostPage, budget: Budget) -> Option<String> {
        let mut opened_here = false;
        if !self.probe(page) {
            self.state.set(DrawerState::Opening);
            if !self.request_open(page) {
                self.state.set(DrawerState::Closed);
                return None;
            }
            opened_here = true;

            if !self.wait_for_open(page, budget).await {
                info!(attempts = self.attempts(budget), "drawer did not open");
                self.state.set(DrawerState::Closed);
                return None;
            }
        }

        self.state.set(DrawerState::Open);
        let digits = {
            let snapshot = page.snapshot();
            let Some(detected) = detect_drawer(&snapshot) else {
                debug!("drawer closed before it could be read");
                self.state.set(DrawerState::Closed);
                return None;
            };
            read_drawer(&snapshot, detected, &self.plan, self.config.text_match)
        };

        if opened_here && self.config.close_policy == DrawerClosePolicy::CloseIfOpened {
            self.close(page);
        }
        digits
    }

    async fn wait_for_open(&self, page: &dyn HostPage, budget: Budget) -> bool {
        let attempts = self.attempts(budget);
        let retry_at = attempts / 2;
        for attempt in 0..attempts {
            sleep(self.config.poll).await;
            if detect_drawer(&page.snapshot()).is_some() {
                debug!(attempt = attempt + 1, "drawer opened");
                sleep(self.config.render_settle).await;
                return true;
            }
            if attempt == retry_at {
                debug!("drawer still closed, clicking again");
                self.request_open(page);
            }
        }
        false
    }

    /// Clicks the contact name or avatar. Never a generic header button:
    /// those open search or the chat menu.
    fn request_open(&self, page: &dyn HostPage) -> bool {
        let snapshot = page.snapshot();
        let Some(target) = snapshot.first_visible_of(&CLICK_TARGETS) else {
            debug!(header = snapshot.select_first(&HEADER).is_some(), "no drawer click target");
            return false;
        };
        debug!(target = %dom::describe(target), "clicking to open drawer");
        click(page, target)
    }

    fn close(&self, page: &dyn HostPage) {
        let snapshot = page.snapshot();
        let Some(control) = snapshot.first_visible_of(&CLOSE_CONTROLS) else {
            debug!("no drawer close control");
            return;
        };
        if click(page, control) {
            self.state.set(DrawerState::Closed);
        }
    }
}

fn click(page: &dyn HostPage, target: ElementRef<'_>) -> bool {
    for event in PointerEvent::CLICK_SEQUENCE {
        if let Err(err) = page.dispatch(target, event) {
            warn!(%event, error = %err, "pointer event dispatch failed");
            return false;
        }
    }
    true
}

/// Opens the drawer if needed, then reads it.
pub struct DrawerStrategy {
    controller: Rc<DrawerController>,
}

impl DrawerStrategy {
    pub fn new(controller: Rc<DrawerController>) -> Self {
        Self { controller }
    }
}

#[async_trait(?Send)]
impl Strategy for DrawerStrategy {
    fn name(&self) -> &'static str {
        "contact drawer"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::Drawer
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        let budget = Budget::for_context(ctx.masked);
        debug!(strategy = self.name(), ?budget, "trying");
        let digits = self.controller.extract(ctx.page.as_ref(), budget).await;
        match digits {
            Some(digits) => {
                debug!(candidate = %digits, source = %self.source(), "found");
                ctx.candidate(&digits, self.source())
            }
            None => {
                debug!(strategy = self.name(), "nothing found");
                None
            }
        }
    }
}

/// Reads a drawer that is already open; never clicks.
pub struct DrawerCopyableStrategy {
    controller: Rc<DrawerController>,
}

impl DrawerCopyableStrategy {
    pub fn new(controller: Rc<DrawerController>) -> Self {
        Self { controller }
    }
}

#[async_trait(?Send)]
impl Strategy for DrawerCopyableStrategy {
    fn name(&self) -> &'static str {
        "open drawer"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::DrawerCopyable
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let digits = self.controller.read_open(ctx.page.as_ref())?;
        debug!(candidate = %digits, source = %self.source(), "found");
        ctx.candidate(&digits, self.source())
    }
}
