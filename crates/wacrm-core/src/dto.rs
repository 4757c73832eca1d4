use crate::domain::{CandidateSource, CycleId, Identifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What caused an extraction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Click,
    HashChange,
    Mutation,
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerReason::Click => "click",
            TriggerReason::HashChange => "hashchange",
            TriggerReason::Mutation => "mutation",
            TriggerReason::Manual => "manual",
        };
        f.write_str(label)
    }
}

/// Payload handed to the downstream consumer after a successful,
/// non-duplicate cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emission {
    pub cycle: CycleId,
    pub reason: TriggerReason,
    pub identifier: Identifier,
    pub lookup_key: String,
    pub source: CandidateSource,
    pub emitted_at: DateTime<Utc>,
}

impl Emission {
    pub fn new(
        cycle: CycleId,
        reason: TriggerReason,
        identifier: Identifier,
        source: CandidateSource,
        suffix_len: usize,
    ) -> Self {
        let lookup_key = identifier.lookup_key(suffix_len);
        Self {
            cycle,
            reason,
            identifier,
            lookup_key,
            source,
            emitted_at: Utc::now(),
        }
    }
}
