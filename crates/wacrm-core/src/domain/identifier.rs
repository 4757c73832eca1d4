use crate::domain::phone::only_digits;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized digit string believed to be the active contact's phone
/// number. Only constructible through [`Identifier::new`], which enforces
/// the minimum length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(raw: &str, min_digits: usize) -> Result<Self, CoreError> {
        let digits = only_digits(raw);
        let min = min_digits.max(1);
        if digits.len() < min {
            return Err(CoreError::IdentifierTooShort {
                len: digits.len(),
                min,
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing `len` digits; the whole identifier when it is shorter.
    pub fn suffix(&self, len: usize) -> &str {
        let start = self.0.len().saturating_sub(len);
        &self.0[start..]
    }

    /// Key the downstream contact lookup matches on.
    pub fn lookup_key(&self, suffix_len: usize) -> String {
        self.suffix(suffix_len).to_string()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    AttributeSweep,
    HeaderLink,
    HeaderText,
    HeaderLabel,
    HeaderSubtitle,
    Url,
    LeftPane,
    Drawer,
    DrawerCopyable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl CandidateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateSource::AttributeSweep => "attribute_sweep",
            CandidateSource::HeaderLink => "header_link",
            CandidateSource::HeaderText => "header_text",
            CandidateSource::HeaderLabel => "header_label",
            CandidateSource::HeaderSubtitle => "header_subtitle",
            CandidateSource::Url => "url",
            CandidateSource::LeftPane => "left_pane",
            CandidateSource::Drawer => "drawer",
            CandidateSource::DrawerCopyable => "drawer_copyable",
        }
    }

    pub fn confidence(self) -> Confidence {
        match self {
            CandidateSource::AttributeSweep
            | CandidateSource::HeaderLink
            | CandidateSource::HeaderSubtitle
            | CandidateSource::Drawer
            | CandidateSource::DrawerCopyable => Confidence::High,
            CandidateSource::HeaderText
            | CandidateSource::HeaderLabel
            | CandidateSource::LeftPane => Confidence::Medium,
            CandidateSource::Url => Confidence::Low,
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digits recovered by one extractor during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    digits: String,
    source: CandidateSource,
}

impl Candidate {
    pub fn new(raw: &str, source: CandidateSource) -> Self {
        Self {
            digits: only_digits(raw),
            source,
        }
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn source(&self) -> CandidateSource {
        self.source
    }

    pub fn into_identifier(self, min_digits: usize) -> Result<Identifier, CoreError> {
        Identifier::new(&self.digits, min_digits)
    }
}

#[cfg(test)]
mod tests {
    use super::{Candidate, CandidateSource, Confidence, Identifier};
    use crate::error::CoreError;

    #[test]
    fn identifier_normalizes_and_enforces_length() {
        let id = Identifier::new("+880 1722-626327", 8).expect("identifier");
        assert_eq!(id.as_str(), "8801722626327");

        let err = Identifier::new("123-4567", 8).unwrap_err();
        assert_eq!(err, CoreError::IdentifierTooShort { len: 7, min: 8 });
        assert!(Identifier::new("", 0).is_err());
    }

    #[test]
    fn identifier_suffix_handles_short_values() {
        let id = Identifier::new("8801722626327", 8).expect("identifier");
        assert_eq!(id.suffix(6), "626327");
        assert_eq!(id.suffix(40), "8801722626327");
        assert_eq!(id.lookup_key(6), "626327");
    }

    #[test]
    fn candidate_keeps_source() {
        let candidate = Candidate::new("tel:+8801722626327", CandidateSource::HeaderLink);
        assert_eq!(candidate.digits(), "8801722626327");
        assert_eq!(candidate.source().confidence(), Confidence::High);
        let id = candidate.into_identifier(8).expect("identifier");
        assert_eq!(id.to_string(), "8801722626327");
    }

    #[test]
    fn url_candidates_rank_lowest() {
        assert!(CandidateSource::Url.confidence() < CandidateSource::LeftPane.confidence());
    }
}
