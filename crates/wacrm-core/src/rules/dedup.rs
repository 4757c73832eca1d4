use crate::domain::Identifier;
use crate::error::CoreError;

pub const DEFAULT_SUFFIX_LEN: usize = 6;
pub const MIN_SUFFIX_LEN: usize = 4;

pub fn validate_suffix_len(len: usize, min_digits: usize) -> Result<usize, CoreError> {
    if !(MIN_SUFFIX_LEN..=min_digits).contains(&len) {
        return Err(CoreError::InvalidSuffixLength(len));
    }
    Ok(len)
}

/// Single-slot memory of the last identifier handed downstream.
///
/// Two identifiers are the same contact when their trailing `suffix_len`
/// digits agree, which is also the key the downstream lookup uses.
#[derive(Debug, Clone)]
pub struct SuffixDedup {
    suffix_len: usize,
    last: Option<Identifier>,
}

impl SuffixDedup {
    pub fn new(suffix_len: usize) -> Self {
        Self {
            suffix_len,
            last: None,
        }
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }

    pub fn last(&self) -> Option<&Identifier> {
        self.last.as_ref()
    }

    pub fn is_duplicate(&self, identifier: &Identifier) -> bool {
        self.last
            .as_ref()
            .is_some_and(|last| last.suffix(self.suffix_len) == identifier.suffix(self.suffix_len))
    }

    /// Records `identifier` unless it repeats the last one; returns whether
    /// it was recorded.
    pub fn observe(&mut self, identifier: &Identifier) -> bool {
        if self.is_duplicate(identifier) {
            return false;
        }
        self.last = Some(identifier.clone());
        true
    }
}
