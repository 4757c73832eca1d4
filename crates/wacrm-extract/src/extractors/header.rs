//! Extractors over the conversation header bar.

use super::{longest_phone_shaped, ExtractionContext, Strategy};
use crate::dom;
use crate::page::PageSnapshot;
use crate::visibility::is_visible;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;
use wacrm_core::{has_min_length, Candidate, CandidateSource};

pub(crate) static HEADERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        "#main header",
        r#"[data-testid="conversation-header"]"#,
        r#"[data-testid="conversation-info-header"]"#,
        r#"[role="banner"]"#,
    ])
});

static TEL_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href^="tel:"]"#).expect("Failed to parse tel link selector - this is a bug")
});

static TITLE_NODES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"[data-testid="conversation-info-header"] [title]"#,
        r#"[data-testid="conversation-header"] [title]"#,
        "h2[title], h1[title], span[title]",
    ])
});

static LABELLED: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        r#"#main header [role="button"][aria-label]"#,
        "#main header [aria-label]",
        r#"[data-testid="conversation-header"] [aria-label]"#,
        r#"[data-testid="conversation-info-header"] [aria-label]"#,
    ])
});

fn header(snapshot: &PageSnapshot) -> Option<ElementRef<'_>> {
    let found = snapshot.first_of(&HEADERS);
    if found.is_none() {
        debug!("no conversation header");
    }
    found.filter(|el| is_visible(snapshot, *el))
}

/// `tel:` link inside the header.
pub struct HeaderLink;

#[async_trait(?Send)]
impl Strategy for HeaderLink {
    fn name(&self) -> &'static str {
        "header tel link"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::HeaderLink
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let header = header(&snapshot)?;
        let candidate = dom::select_within(header, &TEL_LINK)
            .into_iter()
            .filter(|link| is_visible(&snapshot, *link))
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| ctx.candidate(href, self.source()));

        match &candidate {
            Some(found) => debug!(candidate = found.digits(), source = %self.source(), "found"),
            None => debug!(strategy = self.name(), "nothing found"),
        }
        candidate
    }
}

/// Phone-shaped text in the header title, for contacts shown by number.
pub struct HeaderText;

#[async_trait(?Send)]
impl Strategy for HeaderText {
    fn name(&self) -> &'static str {
        "header text"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::HeaderText
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let header = header(&snapshot)?;
        let title = TITLE_NODES
            .iter()
            .find_map(|selector| {
                dom::select_within(header, selector)
                    .into_iter()
                    .find(|el| is_visible(&snapshot, *el))
            })
            .unwrap_or(header);

        let text = dom::visible_text(&snapshot, title);
        let Some(digits) = longest_phone_shaped(text.trim(), ctx.min_digits()) else {
            debug!(strategy = self.name(), "nothing found");
            return None;
        };
        debug!(candidate = %digits, source = %self.source(), "found");
        ctx.candidate(&digits, self.source())
    }
}

/// Digits hidden in an accessibility label of a header control.
pub struct HeaderLabel;

#[async_trait(?Send)]
impl Strategy for HeaderLabel {
    fn name(&self) -> &'static str {
        "header label"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::HeaderLabel
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let label = LABELLED.iter().find_map(|selector| {
            snapshot
                .select_all(selector)
                .into_iter()
                .filter(|el| is_visible(&snapshot, *el))
                .filter_map(|el| el.value().attr("aria-label"))
                .find(|label| has_min_length(label, ctx.min_digits()))
        });

        match label {
            Some(label) => {
                let candidate = ctx.candidate(label, self.source());
                if let Some(found) = &candidate {
                    debug!(candidate = found.digits(), source = %self.source(), "found");
                }
                candidate
            }
            None => {
                debug!(strategy = self.name(), "nothing found");
                None
            }
        }
    }
}
