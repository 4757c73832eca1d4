use super::{ExtractionContext, Strategy};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;
use wacrm_core::{has_min_length, loose_jid_digits, only_digits, path_digits, Candidate, CandidateSource};

const QUERY_KEYS: [&str; 5] = ["phone", "chat", "jid", "id", "number"];

static HASH_KEYED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[/?&])(?:t|c|chat|jid)=?(\d{6,})")
        .expect("Failed to compile hash key regex - this is a bug")
});

static HASH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(?:t|c)/(\d{6,})").expect("Failed to compile hash path regex - this is a bug")
});

/// Digits of a phone number encoded in a page address, checked in order:
/// well-known query parameters, fragment patterns, then the path.
pub fn digits_from_url(address: &str, min_digits: usize) -> Option<String> {
    let url = match Url::parse(address) {
        Ok(url) => url,
        Err(err) => {
            debug!(error = %err, "unparseable page address");
            return None;
        }
    };

    for key in QUERY_KEYS {
        let Some((_, value)) = url.query_pairs().find(|(name, _)| name == key) else {
            continue;
        };
        let digits = loose_jid_digits(&value)
            .map(str::to_string)
            .unwrap_or_else(|| only_digits(&value));
        if has_min_length(&digits, min_digits) {
            debug!(param = key, "number in query");
            return Some(digits);
        }
    }

    if let Some(fragment) = url.fragment() {
        let captured = HASH_KEYED
            .captures(fragment)
            .or_else(|| HASH_PATH.captures(fragment))
            .and_then(|caps| caps.get(1))
            .map(|found| found.as_str())
            .filter(|digits| has_min_length(digits, min_digits));
        if let Some(digits) = captured {
            debug!("number in fragment");
            return Some(digits.to_string());
        }
    }

    path_digits(url.path())
        .filter(|digits| has_min_length(digits, min_digits))
        .map(str::to_string)
}

/// Reads the page address.
pub struct UrlStrategy;

#[async_trait(?Send)]
impl Strategy for UrlStrategy {
    fn name(&self) -> &'static str {
        "page address"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::Url
    }

    async fn attempt(&self, ctx: &ExtractionContext) -> Option<Candidate> {
        debug!(strategy = self.name(), "trying");
        let location = ctx.page.location();
        let Some(digits) = digits_from_url(&location, ctx.min_digits()) else {
            debug!(strategy = self.name(), "nothing found");
            return None;
        };
        debug!(candidate = %digits, source = %self.source(), "found");
        ctx.candidate(&digits, self.source())
    }
}
