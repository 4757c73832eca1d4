use super::{HostPage, PageSnapshot, PointerEvent, Viewport};
use crate::dom;
use crate::error::Result;
use scraper::{ElementRef, Selector};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// One pointer event the engine sent to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub event: PointerEvent,
    pub target: String,
}

struct ClickReaction {
    selector: Selector,
    nth: usize,
    seen: usize,
    delay: Duration,
    markup: String,
}

struct PendingFrame {
    due: Instant,
    markup: String,
}

struct State {
    markup: String,
    location: String,
    current: Rc<PageSnapshot>,
    pending: Vec<PendingFrame>,
    reactions: Vec<ClickReaction>,
    dispatched: Vec<DispatchRecord>,
}

impl State {
    fn rebuild(&mut self, viewport: Viewport) {
        self.current = Rc::new(PageSnapshot::parse(&self.markup, &self.location, viewport));
    }
}

/// A host page backed by static markup.
///
/// Clicks can be scripted to swap in new markup after a delay, which is
/// how the drawer opening is simulated. Time is read from the tokio clock
/// so paused-time tests advance deterministically.
pub struct ScriptedPage {
    viewport: Viewport,
    state: RefCell<State>,
}

impl ScriptedPage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self::with_viewport(markup, Viewport::default())
    }

    pub fn with_viewport(markup: impl Into<String>, viewport: Viewport) -> Self {
        let markup = markup.into();
        let location = String::from("https://web.whatsapp.com/");
        let current = Rc::new(PageSnapshot::parse(&markup, &location, viewport));
        Self {
            viewport,
            state: RefCell::new(State {
                markup,
                location,
                current,
                pending: Vec::new(),
                reactions: Vec::new(),
                dispatched: Vec::new(),
            }),
        }
    }

    pub fn with_location(self, location: impl Into<String>) -> Self {
        self.set_location(location);
        self
    }

    /// After the first click on an element matching `selector`, the page
    /// renders `markup` once `delay` has passed.
    pub fn on_click(&self, selector: &str, delay: Duration, markup: impl Into<String>) -> Result<()> {
        self.on_nth_click(selector, 1, delay, markup)
    }

    /// Like [`on_click`](Self::on_click), but only the `nth` matching click
    /// (1-based) triggers the render.
    pub fn on_nth_click(
        &self,
        selector: &str,
        nth: usize,
        delay: Duration,
        markup: impl Into<String>,
    ) -> Result<()> {
        let selector = dom::compile(selector)?;
        self.state.borrow_mut().reactions.push(ClickReaction {
            selector,
            nth: nth.max(1),
            seen: 0,
            delay,
            markup: markup.into(),
        });
        Ok(())
    }

    pub fn schedule_frame(&self, delay: Duration, markup: impl Into<String>) {
        self.state.borrow_mut().pending.push(PendingFrame {
            due: Instant::now() + delay,
            markup: markup.into(),
        });
    }

    /// Replaces the rendered markup immediately.
    pub fn load(&self, markup: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.markup = markup.into();
        state.rebuild(self.viewport);
    }

    pub fn set_location(&self, location: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.location = location.into();
        state.rebuild(self.viewport);
    }

    pub fn dispatched(&self) -> Vec<DispatchRecord> {
        self.state.borrow().dispatched.clone()
    }

    pub fn click_count(&self) -> usize {
        self.state
            .borrow()
            .dispatched
            .iter()
            .filter(|record| record.event == PointerEvent::Click)
            .count()
    }

    fn promote_due_frames(&self) {
        let now = Instant::now();
        let mut state = self.state.borrow_mut();
        let mut due: Vec<PendingFrame> = Vec::new();
        let mut waiting: Vec<PendingFrame> = Vec::new();
        for frame in state.pending.drain(..) {
            if frame.due <= now {
                due.push(frame);
            } else {
                waiting.push(frame);
            }
        }
        state.pending = waiting;
        if let Some(latest) = due.into_iter().max_by_key(|frame| frame.due) {
            state.markup = latest.markup;
            state.rebuild(self.viewport);
        }
    }
}

impl HostPage for ScriptedPage {
    fn snapshot(&self) -> Rc<PageSnapshot> {
        self.promote_due_frames();
        Rc::clone(&self.state.borrow().current)
    }

    fn dispatch(&self, target: ElementRef<'_>, event: PointerEvent) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.dispatched.push(DispatchRecord {
            event,
            target: dom::describe(target),
        });
        if event != PointerEvent::Click {
            return Ok(());
        }

        let now = Instant::now();
        let mut scheduled = Vec::new();
        for reaction in state.reactions.iter_mut() {
            if !reaction.selector.matches(&target) {
                continue;
            }
            reaction.seen += 1;
            if reaction.seen == reaction.nth {
                scheduled.push(PendingFrame {
                    due: now + reaction.delay,
                    markup: reaction.markup.clone(),
                });
            }
        }
        state.pending.extend(scheduled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ScriptedPage;
    use crate::dom;
    use crate::page::{HostPage, PointerEvent};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn click_reaction_renders_after_delay() {
        let page = ScriptedPage::new(r#"<header><div id="title">Alice</div></header>"#);
        page.on_click(
            "#title",
            Duration::from_millis(200),
            r#"<aside id="drawer">open</aside>"#,
        )
        .expect("reaction");

        let drawer = dom::compile("#drawer").expect("selector");
        let title = dom::compile("#title").expect("selector");
        let snapshot = page.snapshot();
        let target = snapshot.select_first(&title).expect("title");
        page.dispatch(target, PointerEvent::Click).expect("dispatch");

        assert!(page.snapshot().select_first(&drawer).is_none());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(page.snapshot().select_first(&drawer).is_some());
        assert_eq!(page.click_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn nth_click_waits_for_repeat() {
        let page = ScriptedPage::new(r#"<button id="b">x</button>"#);
        page.on_nth_click("#b", 2, Duration::ZERO, "<p id=\"done\"></p>")
            .expect("reaction");
        let button = dom::compile("#b").expect("selector");
        let done = dom::compile("#done").expect("selector");

        let snapshot = page.snapshot();
        let target = snapshot.select_first(&button).expect("button");
        page.dispatch(target, PointerEvent::Click).expect("dispatch");
        assert!(page.snapshot().select_first(&done).is_none());

        page.dispatch(target, PointerEvent::Click).expect("dispatch");
        assert!(page.snapshot().select_first(&done).is_some());
    }

    #[test]
    fn location_is_part_of_snapshot() {
        let page = ScriptedPage::new("<p></p>").with_location("https://web.whatsapp.com/#chat=8801722626327");
        assert!(page.snapshot().location().ends_with("8801722626327"));
    }
}
