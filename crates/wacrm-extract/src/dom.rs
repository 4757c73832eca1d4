//! Small helpers over `scraper` element trees.

use crate::error::{ExtractError, Result};
use crate::page::PageSnapshot;
use crate::visibility::is_visible;
use scraper::node::Node;
use scraper::{ElementRef, Selector};

pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|err| ExtractError::Selector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

/// Compiles a fixed selector table. Only for literals in this crate.
pub(crate) fn compile_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|raw| {
            Selector::parse(raw)
                .unwrap_or_else(|err| panic!("Failed to parse selector {raw:?} - this is a bug: {err}"))
        })
        .collect()
}

/// Matches strictly below `root`; `ElementRef::select` also yields the root.
pub fn select_within<'a>(root: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    root.select(selector)
        .filter(|el| el.id() != root.id())
        .collect()
}

pub fn closest<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|node| selector.matches(node))
}

pub fn is_inside(el: ElementRef<'_>, selector: &Selector) -> bool {
    closest(el, selector).is_some()
}

pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Text nodes below `root` paired with their parent element.
pub fn text_nodes<'a>(root: ElementRef<'a>) -> Vec<(ElementRef<'a>, &'a str)> {
    root.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let parent = node.parent().and_then(ElementRef::wrap)?;
                Some((parent, &**text))
            }
            _ => None,
        })
        .collect()
}

/// Like [`text_content`], but skips text whose parent is not visible.
pub fn visible_text(snapshot: &PageSnapshot, root: ElementRef<'_>) -> String {
    text_nodes(root)
        .into_iter()
        .filter(|(parent, _)| is_visible(snapshot, *parent))
        .map(|(_, text)| text)
        .collect()
}

/// Short human-readable label such as `div#main.pane[role=button]`.
pub fn describe(el: ElementRef<'_>) -> String {
    let value = el.value();
    let mut label = value.name().to_string();
    if let Some(id) = value.id() {
        label.push('#');
        label.push_str(id);
    }
    for class in value.classes() {
        label.push('.');
        label.push_str(class);
    }
    for attr in ["role", "data-testid"] {
        if let Some(found) = value.attr(attr) {
            label.push_str(&format!("[{attr}={found}]"));
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::{closest, compile, describe, select_within, text_nodes, visible_text};
    use crate::page::{PageSnapshot, Viewport};
    use scraper::Html;

    #[test]
    fn compile_reports_bad_selector() {
        assert!(compile("div[").is_err());
        assert!(compile("#main header").is_ok());
    }

    #[test]
    fn select_within_skips_root() {
        let html = Html::parse_fragment(r#"<div class="x" id="r"><div class="x" id="c"></div></div>"#);
        let x = compile(".x").expect("selector");
        let root = html.select(&compile("#r").expect("selector")).next().expect("root");
        let found = select_within(root, &x);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value().id(), Some("c"));
    }

    #[test]
    fn closest_includes_self_and_ancestors() {
        let html = Html::parse_fragment(
            r#"<section role="region"><div><span id="s">x</span></div></section>"#,
        );
        let span = html.select(&compile("#s").expect("selector")).next().expect("span");
        let region = closest(span, &compile("[role=region]").expect("selector"));
        assert_eq!(region.map(|el| el.value().name()), Some("section"));
        assert!(closest(span, &compile("span").expect("selector")).is_some());
    }

    #[test]
    fn text_nodes_keep_parents() {
        let html = Html::parse_fragment(r#"<div id="r"><span title="t">+880 1722</span>tail</div>"#);
        let root = html.select(&compile("#r").expect("selector")).next().expect("root");
        let nodes = text_nodes(root);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].0.value().name(), "span");
        assert_eq!(nodes[1].1, "tail");
        assert_eq!(describe(nodes[0].0), "span");
    }

    #[test]
    fn visible_text_drops_hidden_descendants() {
        let snapshot = PageSnapshot::parse(
            r#"<div id="r">Alice<span style="display:none">+880 1722-626327</span><b hidden>x</b> online</div>"#,
            "https://web.whatsapp.com/",
            Viewport::default(),
        );
        let root = snapshot
            .select_first(&compile("#r").expect("selector"))
            .expect("root");
        assert_eq!(visible_text(&snapshot, root), "Alice online");
    }
}
