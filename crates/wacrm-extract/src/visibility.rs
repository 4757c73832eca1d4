use crate::page::PageSnapshot;
use scraper::ElementRef;

/// Whether a user could see `el` in the current render.
///
/// Evaluated fresh on every call: the host re-renders without notice.
pub fn is_visible(page: &PageSnapshot, el: ElementRef<'_>) -> bool {
    let style = page.computed_style(el);
    if style.display == "none" || style.visibility == "hidden" || style.opacity == 0.0 {
        return false;
    }
    let rect = page.bounding_box(el);
    rect.width > 0.0 && rect.height > 0.0
}

#[cfg(test)]
mod tests {
    use super::is_visible;
    use crate::dom;
    use crate::page::{PageSnapshot, Viewport};

    fn check(markup: &str) -> bool {
        let page = PageSnapshot::parse(markup, "https://web.whatsapp.com/", Viewport::default());
        let target = dom::compile("#t").expect("selector");
        let el = page.select_first(&target).expect("target");
        is_visible(&page, el)
    }

    #[test]
    fn plain_element_is_visible() {
        assert!(check(r#"<span id="t">x</span>"#));
    }

    #[test]
    fn hidden_by_style_or_ancestor() {
        assert!(!check(r#"<span id="t" style="display:none">x</span>"#));
        assert!(!check(r#"<span id="t" style="visibility:hidden">x</span>"#));
        assert!(!check(r#"<span id="t" style="opacity:0">x</span>"#));
        assert!(!check(r#"<div hidden><span id="t">x</span></div>"#));
        assert!(!check(r#"<div style="visibility: hidden"><span id="t">x</span></div>"#));
    }

    #[test]
    fn zero_sized_box_is_invisible() {
        assert!(!check(r#"<span id="t" style="width:0px">x</span>"#));
        assert!(!check(r#"<span id="t" style="height:0">x</span>"#));
    }

    #[test]
    fn faint_but_nonzero_opacity_is_visible() {
        assert!(check(r#"<span id="t" style="opacity:0.01">x</span>"#));
        assert!(check(r#"<div style="opacity:0"><span id="t">x</span></div>"#));
    }
}
