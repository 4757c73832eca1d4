use anyhow::{Context as _, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tokio::runtime::{Builder, Runtime};
use url::Url;
use wacrm_config::AppConfig;
use wacrm_core::Identifier;
use wacrm_extract::CycleOutcome;

use crate::error::invalid_input;

pub mod completions;
pub mod extract;
pub mod local;
pub mod replay;
pub mod scan;

pub const DEFAULT_LOCATION: &str = "https://web.whatsapp.com/";

pub struct Context<'a> {
    pub json: bool,
    pub config: &'a AppConfig,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn read_markup(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read page markup {}", path.display()))
}

/// Single-threaded runtime: the engine's page and tasks are not `Send`.
pub fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_time()
        .build()
        .with_context(|| "start async runtime")
}

/// Host page addresses must be absolute URLs.
pub fn parse_location(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|err| invalid_input(format!("invalid url {raw}: {err}")))?;
    Ok(url.to_string())
}

/// Flat view of a cycle result for `--json` output.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<String>,
}

impl CycleReport {
    pub fn from_outcome(outcome: &CycleOutcome, suffix_len: usize) -> Self {
        match outcome {
            CycleOutcome::Emitted(emission) => Self {
                outcome: "emitted",
                identifier: Some(emission.identifier.to_string()),
                lookup_key: Some(emission.lookup_key.clone()),
                source: Some(emission.source.to_string()),
                cycle: Some(emission.cycle.to_string()),
            },
            CycleOutcome::Duplicate(identifier) => {
                Self::bare("duplicate", Some(identifier), suffix_len)
            }
            CycleOutcome::NotFound => Self::bare("not_found", None, suffix_len),
            CycleOutcome::Skipped => Self::bare("skipped", None, suffix_len),
        }
    }

    fn bare(outcome: &'static str, identifier: Option<&Identifier>, suffix_len: usize) -> Self {
        Self {
            outcome,
            identifier: identifier.map(ToString::to_string),
            lookup_key: identifier.map(|id| id.lookup_key(suffix_len)),
            source: None,
            cycle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_location, CycleReport};
    use wacrm_core::Identifier;
    use wacrm_extract::CycleOutcome;

    #[test]
    fn parse_location_rejects_relative_addresses() {
        assert!(parse_location("https://web.whatsapp.com/#t=8801722626327").is_ok());
        assert!(parse_location("/send?phone=1").is_err());
    }

    #[test]
    fn duplicate_report_carries_lookup_key() {
        let identifier = Identifier::new("8801722626327", 8).expect("identifier");
        let report = CycleReport::from_outcome(&CycleOutcome::Duplicate(identifier), 6);
        assert_eq!(report.outcome, "duplicate");
        assert_eq!(report.lookup_key.as_deref(), Some("626327"));
        assert!(report.source.is_none());
    }
}
