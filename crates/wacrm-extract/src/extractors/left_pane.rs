use super::{jid_attribute_digits, longest_phone_shaped, ExtractionContext, Strategy};
use crate::dom;
use crate::page::PageSnapshot;
use crate::visibility::is_visible;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;
use wacrm_core::{Candidate, CandidateSource};

pub(crate) static CHAT_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-testid="cell-frame-container"], [role="row"], [role="listitem"]"#)
        .expect("Failed to parse chat row selector - this is a bug")
});

static ROW_TITLES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"[data-testid="cell-frame-title"] [title]"#,
        "[title]",
        r#"span[dir="auto"]"#,
    ])
});

fn is_marked_selected(row: ElementRef<'_>) -> bool {
    ["aria-selected", "data-selected"]
        .iter()
        .any(|attr| row.value().attr(attr) == Some("true"))
}

/// The row the user has open: explicitly marked, else the one taking the
/// most on-screen space.
fn selected_row<'a>(snapshot: &'a PageSnapshot) -> Option<ElementRef<'a>> {
    let rows: Vec<ElementRef<'a>> = snapshot
        .select_all(&CHAT_ROWS)
        .into_iter()
        .filter(|row| is_visible(snapshot, *row))
        .collect();
    if let Some(marked) = rows.iter().copied().find(|row| is_marked_selected(*row)) {
        return Some(marked);
    }

    let viewport = snapshot.viewport();
    let mut best: Option<(ElementRef<'a>, f64)> = None;
    for row in rows {
        let area = snapshot.bounding_box(row).visible_area(viewport);
        match best {
            Some((_, best_area)) if best_area >= area => {}
            _ => best = Some((row, area)),
        }
    }
    best.map(|(row, _)| row)
}

fn row_text(snapshot: &PageSnapshot, row: ElementRef<'_>) -> String {
    let title = ROW_TITLES.iter().find_map(|selector| {
        dom::select_within(row, selector)
            .into_iter()
            .find(|el| is_visible(snapshot, *el))
    });
    match title {
        Some(el) => el
            .value()
            .attr("title")
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| dom::visible_text(snapshot, el)),
        None => dom::visible_text(snapshot, row),
    }
}

/// The highlighted conversation in the chat list.
pub struct LeftPaneSelection;

#[async_trait(?Send)]
impl Strategy for LeftPaneSelection {
    fn name(&self) -> &'static str {
        "left pane selection"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::LeftPane
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let Some(row) = selected_row(&snapshot) else {
            debug!("no visible chat rows");
            return None;
        };

        let digits = jid_attribute_digits(row, ctx.min_digits())
            .map(|(_, digits)| digits)
            .or_else(|| longest_phone_shaped(row_text(&snapshot, row).trim(), ctx.min_digits()));
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

#[cfg(test)]
mod tests {
    use super::LeftPaneSelection;
    use crate::extractors::testing::context;
    use crate::extractors::Strategy;

    #[tokio::test]
    async fn explicit_selection_wins() {
        let ctx = context(
            r#"<div id="pane-side">
                <div role="row" data-id="8801911111111@c.us" style="height:300px">a</div>
                <div role="row" aria-selected="true" data-id="8801722626327@c.us">b</div>
            </div>"#,
        );
        let candidate = LeftPaneSelection.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "8801722626327");
    }

    #[tokio::test]
    async fn largest_visible_row_without_selection() {
        let ctx = context(
            r#"<div id="pane-side">
                <div role="listitem" style="top:0px; height:72px"><span title="+880 1911-111111">x</span></div>
                <div role="listitem" style="top:780px; height:72px"><span title="+880 1722-626327">y</span></div>
            </div>"#,
        );
        let candidate = LeftPaneSelection.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "8801911111111");
    }

    #[tokio::test]
    async fn masked_row_falls_back_to_title() {
        let ctx = context(
            r#"<div role="row" aria-selected="true" data-id="false_99@lid_abc">
                <div data-testid="cell-frame-title"><span title="+880 1722-626327">+880 1722-626327</span></div>
            </div>"#,
        );
        let candidate = LeftPaneSelection.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "8801722626327");
    }

    #[tokio::test]
    async fn named_row_gives_nothing() {
        let ctx = context(r#"<div role="row" aria-selected="true"><span title="Alice">Alice</span></div>"#);
        assert!(LeftPaneSelection.attempt(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn hidden_row_text_gives_nothing() {
        let ctx = context(
            r#"<div role="row" aria-selected="true">
                <span title="+880 1722-626327" style="display:none">x</span>
                <span>Alice</span><span style="visibility:hidden">+880 1911-111111</span>
            </div>"#,
        );
        assert!(LeftPaneSelection.attempt(&ctx).await.is_none());
    }
}
