//! The host page as the engine sees it.
//!
//! A [`HostPage`] hands out immutable [`PageSnapshot`]s of its current
//! render and accepts exactly one kind of write: synthetic pointer events
//! on a single element. Everything else the engine does is a read.

pub mod fixture;
pub mod style;

use crate::error::Result;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::rc::Rc;

pub use fixture::ScriptedPage;
pub use style::{ComputedStyle, Rect, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEvent {
    PointerDown,
    MouseDown,
    MouseUp,
    Click,
}

impl PointerEvent {
    /// Full sequence a real user click produces.
    pub const CLICK_SEQUENCE: [PointerEvent; 4] = [
        PointerEvent::PointerDown,
        PointerEvent::MouseDown,
        PointerEvent::MouseUp,
        PointerEvent::Click,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PointerEvent::PointerDown => "pointerdown",
            PointerEvent::MouseDown => "mousedown",
            PointerEvent::MouseUp => "mouseup",
            PointerEvent::Click => "click",
        }
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait HostPage {
    /// The page as currently rendered. Callers must not hold on to a
    /// snapshot across a suspension point when they need fresh state.
    fn snapshot(&self) -> Rc<PageSnapshot>;

    fn dispatch(&self, target: ElementRef<'_>, event: PointerEvent) -> Result<()>;

    fn location(&self) -> String {
        self.snapshot().location().to_string()
    }
}

/// One render of the host page: markup, address and viewport.
///
/// Computed style and layout boxes are derived from inline `style`
/// declarations (see [`style`]).
pub struct PageSnapshot {
    html: Html,
    location: String,
    viewport: Viewport,
}

impl fmt::Debug for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSnapshot")
            .field("location", &self.location)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl PageSnapshot {
    pub fn parse(markup: &str, location: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            html: Html::parse_document(markup),
            location: location.into(),
            viewport,
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }

    /// First match of the first selector that matches anything.
    pub fn first_of(&self, selectors: &[Selector]) -> Option<ElementRef<'_>> {
        selectors
            .iter()
            .find_map(|selector| self.select_first(selector))
    }

    /// Like [`first_of`](Self::first_of), but a selector only wins when its
    /// first match is visible.
    pub fn first_visible_of(&self, selectors: &[Selector]) -> Option<ElementRef<'_>> {
        selectors.iter().find_map(|selector| {
            self.select_first(selector)
                .filter(|el| crate::visibility::is_visible(self, *el))
        })
    }

    pub fn computed_style(&self, el: ElementRef<'_>) -> ComputedStyle {
        style::computed_style(el)
    }

    pub fn bounding_box(&self, el: ElementRef<'_>) -> Rect {
        style::layout_box(el)
    }
}
