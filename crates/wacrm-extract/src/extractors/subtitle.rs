use super::{has_digit_or_plus, scannable, ExtractionContext, Strategy};
use crate::dom;
use crate::page::PageSnapshot;
use crate::visibility::is_visible;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;
use wacrm_core::{Candidate, CandidateSource, NumberPlan};

static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        "#main header",
        "#main section",
        r#"[data-testid="conversation-header"]"#,
        r#"[data-testid="conversation-info-header"]"#,
        "#main",
    ])
});

/// Selectable text the host renders for copyable values such as numbers.
pub(crate) static COPYABLE_TEXT: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"[data-testid="selectable-text"].copyable-text"#,
        r#"span.copyable-text[data-testid="selectable-text"]"#,
        ".copyable-text._ao3e._aupe",
        "span.copyable-text",
    ])
});

pub(crate) static SUBTITLE_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.x1evy7pa.x1anpbxc, div.x1c4vz4f.xs83m0k")
        .expect("Failed to parse subtitle selector - this is a bug")
});

static SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("Failed to parse span selector - this is a bug"));

fn first_mobile(snapshot: &PageSnapshot, plan: &NumberPlan, el: ElementRef<'_>) -> Option<String> {
    let text = dom::visible_text(snapshot, el);
    let text = scannable(&text)?;
    plan.find_mobiles(text).into_iter().next()
}

fn scan_container(snapshot: &PageSnapshot, container: ElementRef<'_>, plan: &NumberPlan) -> Option<String> {
    let copyable = COPYABLE_TEXT.iter().find_map(|selector| {
        dom::select_within(container, selector)
            .into_iter()
            .filter(|el| is_visible(snapshot, *el))
            .find_map(|el| first_mobile(snapshot, plan, el))
    });
    if copyable.is_some() {
        return copyable;
    }

    let subtitle = dom::select_within(container, &SUBTITLE_BLOCKS)
        .into_iter()
        .filter(|block| is_visible(snapshot, *block))
        .find_map(|block| {
            dom::select_within(block, &SPAN)
                .into_iter()
                .filter(|span| is_visible(snapshot, *span))
                .find_map(|span| first_mobile(snapshot, plan, span))
        });
    if subtitle.is_some() {
        return subtitle;
    }

    dom::select_within(container, &SPAN)
        .into_iter()
        .filter(|span| is_visible(snapshot, *span))
        .filter(|span| has_digit_or_plus(&dom::visible_text(snapshot, *span)))
        .find_map(|span| first_mobile(snapshot, plan, span))
}

/// The secondary line under a saved contact's name, where the host shows
/// the number.
pub struct HeaderSubtitle;

#[async_trait(?Send)]
impl Strategy for HeaderSubtitle {
    fn name(&self) -> &'static str {
        "header subtitle"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::HeaderSubtitle
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let found = CONTAINERS.iter().find_map(|selector| {
            let container = snapshot
                .select_first(selector)
                .filter(|el| is_visible(&snapshot, *el))?;
            scan_container(&snapshot, container, ctx.plan())
        });

        match found {
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
    use super::HeaderSubtitle;
    use crate::extractors::testing::context;
    use crate::extractors::Strategy;

    #[tokio::test]
    async fn copyable_text_in_header() {
        let ctx = context(
            r#"<div id="main"><header>
                <span>Alice</span>
                <span class="copyable-text" data-testid="selectable-text">+880 1722-626327</span>
            </header></div>"#,
        );
        let candidate = HeaderSubtitle.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "8801722626327");
    }

    #[tokio::test]
    async fn subtitle_block_spans() {
        let ctx = context(
            r#"<div id="main"><header>
                <div class="x1evy7pa x1anpbxc"><span>~Alice</span><span>01722-626327</span></div>
            </header></div>"#,
        );
        let candidate = HeaderSubtitle.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "01722626327");
    }

    #[tokio::test]
    async fn generic_span_fallback_takes_first_mobile() {
        let ctx = context(
            r#"<div id="main">
                <header><span>Project group</span></header>
                <section><span>members: +880 1911-111111, +880 1722-626327</span></section>
            </div>"#,
        );
        let candidate = HeaderSubtitle.attempt(&ctx).await.expect("candidate");
        assert_eq!(candidate.digits(), "8801911111111");
    }

    #[tokio::test]
    async fn non_mobile_numbers_are_not_candidates() {
        let ctx = context(
            r#"<div id="main"><header><span>+1 415 555 1212</span></header></div>"#,
        );
        assert!(HeaderSubtitle.attempt(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn hidden_copyable_text_is_skipped() {
        let ctx = context(
            r#"<div id="main"><header>
                <span class="copyable-text" style="opacity:0">+880 1722-626327</span>
            </header></div>"#,
        );
        assert!(HeaderSubtitle.attempt(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn hidden_span_in_subtitle_block_is_skipped() {
        let ctx = context(
            r#"<div id="main"><header>
                <div class="x1evy7pa x1anpbxc"><span>Alice</span><span style="display:none">+880 1722-626327</span></div>
            </header></div>"#,
        );
        assert!(HeaderSubtitle.attempt(&ctx).await.is_none());
    }
}
