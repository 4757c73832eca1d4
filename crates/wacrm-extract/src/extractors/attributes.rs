use super::{ExtractionContext, Strategy};
use crate::dom;
use crate::visibility::is_visible;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;
use wacrm_core::{has_min_length, is_masked_jid, jid_phone_digits, Candidate, CandidateSource};

/// Attributes the host uses to carry conversation identifiers.
pub const JID_ATTRIBUTES: [&str; 4] = ["data-id", "data-jid", "data-chatid", "data-conversation-id"];

pub(crate) static CONVERSATION_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    dom::compile_all(&[
        "#main",
        r#"[data-testid="conversation-panel"]"#,
        r#"div[tabindex="-1"][data-tab]"#,
    ])
});

static JID_CARRIERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-id], [data-jid], [data-chatid], [data-conversation-id]")
        .expect("Failed to parse jid carrier selector - this is a bug")
});

/// Phone digits from the first identifier attribute on `el` that is not
/// masked and encodes a long enough number.
pub(crate) fn jid_attribute_digits(el: ElementRef<'_>, min_digits: usize) -> Option<(&'static str, String)> {
    JID_ATTRIBUTES.iter().find_map(|attr| {
        let raw = el.value().attr(attr)?;
        if is_masked_jid(raw) {
            return None;
        }
        let digits = jid_phone_digits(raw)?;
        has_min_length(digits, min_digits).then(|| (*attr, digits.to_string()))
    })
}

/// Sweeps identifier attributes of every visible node in the open
/// conversation.
pub struct AttributeSweep;

#[async_trait(?Send)]
impl Strategy for AttributeSweep {
    fn name(&self) -> &'static str {
        "attribute sweep"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::AttributeSweep
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let snapshot = ctx.page.snapshot();
        let Some(root) = snapshot
            .first_of(&CONVERSATION_ROOTS)
            .filter(|root| is_visible(&snapshot, *root))
        else {
            debug!("no visible conversation root");
            return None;
        };

        let found = dom::select_within(root, &JID_CARRIERS)
            .into_iter()
            .filter(|el| is_visible(&snapshot, *el))
            .find_map(|el| jid_attribute_digits(el, ctx.min_digits()));

        match found {
            Some((attr, digits)) => {
                debug!(candidate = %digits, source = %self.source(), attr, "found");
                ctx.candidate(&digits, self.source())
            }
            None => {
                debug!(strategy = self.name(), "nothing found");
                None
            }
        }
    }
}
