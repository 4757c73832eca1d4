//! Candidate extractors.
//!
//! Each extractor reads one region of the page and either produces a
//! [`Candidate`] or nothing. None of them writes to the page; opening the
//! contact drawer is the job of [`crate::drawer`].

mod attributes;
mod header;
mod left_pane;
mod subtitle;
mod url;

use crate::page::HostPage;
use async_trait::async_trait;
use regex::Regex;
use std::rc::Rc;
use std::sync::LazyLock;
use wacrm_config::AppConfig;
use wacrm_core::{has_min_length, only_digits, Candidate, CandidateSource, NumberPlan};

pub use attributes::AttributeSweep;
pub use header::{HeaderLabel, HeaderLink, HeaderText};
pub use left_pane::LeftPaneSelection;
pub use subtitle::HeaderSubtitle;
pub use self::url::{digits_from_url, UrlStrategy};

pub(crate) use attributes::jid_attribute_digits;

static PHONE_SHAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\s\-().]{6,}").expect("Failed to compile phone-shaped regex - this is a bug")
});

/// Ambient state captured once at the start of a cycle.
pub struct ExtractionContext {
    pub page: Rc<dyn HostPage>,
    pub config: Rc<AppConfig>,
    pub masked: bool,
    pub drawer_open: bool,
}

impl ExtractionContext {
    pub fn min_digits(&self) -> usize {
        self.config.extraction.min_digits
    }

    pub fn plan(&self) -> &NumberPlan {
        &self.config.number_plan
    }

    /// Wraps `raw` as a candidate when it carries enough digits.
    pub(crate) fn candidate(&self, raw: &str, source: CandidateSource) -> Option<Candidate> {
        has_min_length(raw, self.min_digits()).then(|| Candidate::new(raw, source))
    }
}

#[async_trait(?Send)]
pub trait Strategy {
    fn name(&self) -> &'static str;

    fn source(&self) -> CandidateSource;

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate>;
}

/// Builds the strategy for a page-reading source. Drawer stages need the
/// session's drawer controller and are built by the orchestrator.
pub fn page_strategy(source: CandidateSource) -> Option<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match source {
        CandidateSource::AttributeSweep => Box::new(AttributeSweep),
        CandidateSource::HeaderLink => Box::new(HeaderLink),
        CandidateSource::HeaderText => Box::new(HeaderText),
        CandidateSource::HeaderLabel => Box::new(HeaderLabel),
        CandidateSource::HeaderSubtitle => Box::new(HeaderSubtitle),
        CandidateSource::Url => Box::new(UrlStrategy),
        CandidateSource::LeftPane => Box::new(LeftPaneSelection),
        CandidateSource::Drawer | CandidateSource::DrawerCopyable => return None,
    };
    Some(strategy)
}

/// Longest phone-shaped run in `text` with at least `min` digits.
pub fn longest_phone_shaped(text: &str, min: usize) -> Option<String> {
    PHONE_SHAPED
        .find_iter(text)
        .map(|found| only_digits(found.as_str()))
        .filter(|digits| digits.len() >= min)
        .fold(None, |best: Option<String>, digits| match best {
            Some(current) if current.len() >= digits.len() => Some(current),
            _ => Some(digits),
        })
}

/// Trimmed text worth scanning: at least eight characters.
pub(crate) fn scannable(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (trimmed.chars().count() >= 8).then_some(trimmed)
}

pub(crate) fn has_digit_or_plus(text: &str) -> bool {
    text.chars().any(|ch| ch.is_ascii_digit() || ch == '+')
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ExtractionContext;
    use crate::page::ScriptedPage;
    use std::rc::Rc;
    use wacrm_config::AppConfig;

    pub fn context(markup: &str) -> ExtractionContext {
        context_for(Rc::new(ScriptedPage::new(markup)))
    }

    pub fn context_for(page: Rc<ScriptedPage>) -> ExtractionContext {
        ExtractionContext {
            page,
            config: Rc::new(AppConfig::default()),
            masked: false,
            drawer_open: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{has_digit_or_plus, longest_phone_shaped, page_strategy, scannable};
    use wacrm_core::CandidateSource;

    #[test]
    fn longest_phone_shaped_prefers_longer_runs() {
        assert_eq!(
            longest_phone_shaped("Office 0123-4567, cell +880 1722-626327", 8),
            Some("8801722626327".to_string())
        );
        assert_eq!(longest_phone_shaped("Alice", 8), None);
        assert_eq!(longest_phone_shaped("ext 12-34-56", 8), None);
    }

    #[test]
    fn longest_phone_shaped_keeps_first_of_equal_length() {
        assert_eq!(
            longest_phone_shaped("01911111111 or 01722626327", 8),
            Some("01911111111".to_string())
        );
    }

    #[test]
    fn scannable_requires_eight_chars() {
        assert_eq!(scannable("  +880 172  "), Some("+880 172"));
        assert_eq!(scannable(" online "), None);
        assert!(has_digit_or_plus("+ab"));
        assert!(!has_digit_or_plus("typing..."));
    }

    #[test]
    fn drawer_sources_are_not_page_strategies() {
        assert!(page_strategy(CandidateSource::Drawer).is_none());
        assert!(page_strategy(CandidateSource::DrawerCopyable).is_none());
        let url = page_strategy(CandidateSource::Url).expect("url strategy");
        assert_eq!(url.source(), CandidateSource::Url);
    }
}
