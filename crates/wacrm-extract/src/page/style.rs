//! Computed style and layout derived from inline declarations.
//!
//! `display:none` (or the `hidden` attribute) on an element or any ancestor
//! collapses its box. `visibility` inherits, `opacity` does not. Boxes are
//! read from `left`, `top`, `width` and `height` in px and default to a
//! 100x20 box at the origin.

use scraper::ElementRef;

const DEFAULT_WIDTH: f64 = 100.0;
const DEFAULT_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Area of the part of the box inside the viewport.
    pub fn visible_area(&self, viewport: Viewport) -> f64 {
        let w = (viewport.width.min(self.x + self.width) - self.x.max(0.0)).max(0.0);
        let h = (viewport.height.min(self.y + self.height) - self.y.max(0.0)).max(0.0);
        w * h
    }
}

fn declaration(el: ElementRef<'_>, name: &str) -> Option<String> {
    let style = el.value().attr("style")?;
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
        .last()
}

fn own_display(el: ElementRef<'_>) -> String {
    if el.value().attr("hidden").is_some() {
        return "none".to_string();
    }
    declaration(el, "display").unwrap_or_else(|| "block".to_string())
}

fn ancestors(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

pub(crate) fn computed_style(el: ElementRef<'_>) -> ComputedStyle {
    let visibility = std::iter::once(el)
        .chain(ancestors(el))
        .find_map(|node| declaration(node, "visibility"))
        .unwrap_or_else(|| "visible".to_string());
    let opacity = declaration(el, "opacity")
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(1.0);

    ComputedStyle {
        display: own_display(el),
        visibility,
        opacity,
    }
}

fn px(value: Option<String>, default: f64) -> f64 {
    value
        .and_then(|raw| raw.trim_end_matches("px").trim().parse::<f64>().ok())
        .unwrap_or(default)
}

pub(crate) fn layout_box(el: ElementRef<'_>) -> Rect {
    let collapsed = std::iter::once(el)
        .chain(ancestors(el))
        .any(|node| own_display(node) == "none");
    if collapsed {
        return Rect::default();
    }

    Rect {
        x: px(declaration(el, "left"), 0.0),
        y: px(declaration(el, "top"), 0.0),
        width: px(declaration(el, "width"), DEFAULT_WIDTH),
        height: px(declaration(el, "height"), DEFAULT_HEIGHT),
    }
}

#[cfg(test)]
mod tests {
    use super::{computed_style, layout_box, Rect, Viewport};
    use scraper::{Html, Selector};

    fn with_target<F: FnOnce(scraper::ElementRef<'_>)>(markup: &str, check: F) {
        let html = Html::parse_document(markup);
        let selector = Selector::parse("#target").expect("selector");
        let el = html.select(&selector).next().expect("target");
        check(el);
    }

    #[test]
    fn visibility_inherits_but_opacity_does_not() {
        with_target(
            r#"<div style="visibility: hidden; opacity: 0"><span id="target">x</span></div>"#,
            |el| {
                let style = computed_style(el);
                assert_eq!(style.visibility, "hidden");
                assert_eq!(style.opacity, 1.0);
                assert_eq!(style.display, "block");
            },
        );
    }

    #[test]
    fn hidden_ancestor_collapses_box() {
        with_target(
            r#"<div hidden><span id="target" style="width: 40px">x</span></div>"#,
            |el| assert_eq!(layout_box(el), Rect::default()),
        );
        with_target(
            r#"<div style="display:none"><span id="target">x</span></div>"#,
            |el| assert_eq!(layout_box(el).width, 0.0),
        );
    }

    #[test]
    fn box_reads_inline_geometry() {
        with_target(
            r#"<div id="target" style="left: 10px; top: 5px; width: 200px; height: 0px"></div>"#,
            |el| {
                let rect = layout_box(el);
                assert_eq!(rect.x, 10.0);
                assert_eq!(rect.width, 200.0);
                assert_eq!(rect.height, 0.0);
            },
        );
    }

    #[test]
    fn visible_area_clips_to_viewport() {
        let viewport = Viewport {
            width: 100.0,
            height: 100.0,
        };
        let rect = Rect {
            x: 50.0,
            y: -10.0,
            width: 100.0,
            height: 30.0,
        };
        assert_eq!(rect.visible_area(viewport), 50.0 * 20.0);

        let offscreen = Rect {
            x: 0.0,
            y: 500.0,
            width: 100.0,
            height: 30.0,
        };
        assert_eq!(offscreen.visible_area(viewport), 0.0);
    }
}
