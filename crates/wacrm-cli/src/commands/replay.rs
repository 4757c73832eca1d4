//! Drives the engine through a recorded sequence of page events.
//!
//! A script is JSON Lines, one step per line:
//!
//! ```text
//! {"step": "load", "file": "chat.html"}
//! {"step": "on_click", "target": "#main header *", "delay_ms": 350, "file": "drawer.html"}
//! {"step": "click", "target": "#row-b span"}
//! {"step": "wait", "ms": 2000}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Relative `file`
//! paths resolve against the script's directory.

use crate::commands::{parse_location, read_markup, runtime, Context, CycleReport};
use crate::error::{invalid_input, not_found};
use crate::notify::notifier_for;
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::{JoinHandle, LocalSet};
use tokio::time::sleep;
use tracing::{debug, info};
use wacrm_core::TriggerReason;
use wacrm_extract::{ChangeReactor, CycleOutcome, Orchestrator, ScriptedPage, Trigger};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    #[arg(long)]
    pub script: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Load {
        html: Option<String>,
        file: Option<PathBuf>,
    },
    Location {
        url: String,
    },
    OnClick {
        target: String,
        #[serde(default)]
        delay_ms: u64,
        html: Option<String>,
        file: Option<PathBuf>,
    },
    Click {
        target: String,
    },
    #[serde(rename = "hashchange")]
    HashChange,
    Mutation {
        target: String,
    },
    Wait {
        ms: u64,
    },
    Extract,
}

#[derive(Debug, Default)]
struct ReplaySummary {
    cycles: usize,
    emitted: usize,
    duplicate: usize,
    not_found: usize,
    skipped: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Emitted(_) => self.emitted += 1,
            CycleOutcome::Duplicate(_) => self.duplicate += 1,
            CycleOutcome::NotFound => self.not_found += 1,
            CycleOutcome::Skipped => self.skipped += 1,
        }
    }
}

pub fn parse_script(contents: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: Step = serde_json::from_str(trimmed)
            .with_context(|| format!("parse replay step on line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

fn resolve_markup(base: &Path, html: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (html, file) {
        (Some(html), None) => Ok(html.to_string()),
        (None, Some(file)) => read_markup(&base.join(file)),
        _ => Err(invalid_input("a step needs exactly one of `html` or `file`")),
    }
}

pub fn replay(ctx: &Context<'_>, args: ReplayArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.script)
        .with_context(|| format!("read replay script {}", args.script.display()))?;
    let steps = parse_script(&contents)?;
    let base = args
        .script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let page = Rc::new(ScriptedPage::new(""));
    let notifier = notifier_for(&ctx.config.notifications, ctx.json)?;
    let orchestrator = Rc::new(Orchestrator::new(ctx.config.clone(), page.clone(), notifier));
    let reactor = ChangeReactor::new(Rc::clone(&orchestrator), page.clone());

    let local = LocalSet::new();
    let summary = runtime()?.block_on(local.run_until(async {
        let mut pending: Vec<JoinHandle<CycleOutcome>> = Vec::new();
        let mut summary = ReplaySummary::default();
        for step in steps {
            debug!(?step, "replay step");
            match step {
                Step::Load { html, file } => {
                    page.load(resolve_markup(&base, html.as_deref(), file.as_deref())?);
                }
                Step::Location { url } => page.set_location(parse_location(&url)?),
                Step::OnClick {
                    target,
                    delay_ms,
                    html,
                    file,
                } => {
                    let markup = resolve_markup(&base, html.as_deref(), file.as_deref())?;
                    page.on_click(&target, Duration::from_millis(delay_ms), markup)
                        .with_context(|| format!("register click reaction on {target}"))?;
                }
                Step::Click { target } => {
                    pending.extend(reactor.handle(&Trigger::Click { target }))
                }
                Step::HashChange => pending.extend(reactor.handle(&Trigger::HashChange)),
                Step::Mutation { target } => {
                    pending.extend(reactor.handle(&Trigger::Mutation { target }))
                }
                Step::Wait { ms } => sleep(Duration::from_millis(ms)).await,
                Step::Extract => {
                    let outcome = orchestrator.run_cycle(TriggerReason::Manual).await;
                    summary.record(&outcome);
                    log_outcome(&outcome, ctx);
                }
            }
        }
        for handle in pending {
            let outcome = handle.await.with_context(|| "join extraction cycle")?;
            summary.record(&outcome);
            log_outcome(&outcome, ctx);
        }
        Ok::<_, anyhow::Error>(summary)
    }))?;

    info!(
        cycles = summary.cycles,
        emitted = summary.emitted,
        "replay finished"
    );
    if !ctx.json {
        println!(
            "cycles: {}  emitted: {}  duplicate: {}  not found: {}  skipped: {}",
            summary.cycles, summary.emitted, summary.duplicate, summary.not_found, summary.skipped
        );
    }

    if summary.emitted == 0 {
        return Err(not_found("replay emitted no identifier"));
    }
    Ok(())
}

fn log_outcome(outcome: &CycleOutcome, ctx: &Context<'_>) {
    let report = CycleReport::from_outcome(outcome, ctx.config.extraction.dedup_suffix_len);
    debug!(
        outcome = report.outcome,
        identifier = report.identifier.as_deref().unwrap_or("-"),
        "cycle finished"
    );
}
