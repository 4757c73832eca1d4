use crate::commands::{
    parse_location, print_json, read_markup, runtime, Context, CycleReport, DEFAULT_LOCATION,
};
use crate::error::not_found;
use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use wacrm_core::TriggerReason;
use wacrm_extract::{CycleOutcome, MemoryNotifier, Orchestrator, ScriptedPage};

/// Matches every element the drawer controller may click.
pub const DRAWER_TRIGGER: &str = "#main header, #main header *";

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// HTML of the page as rendered when the cycle starts
    #[arg(long)]
    pub page: PathBuf,
    /// HTML the page renders once the contact header is clicked
    #[arg(long)]
    pub drawer: Option<PathBuf>,
    #[arg(long, default_value_t = 350)]
    pub drawer_delay_ms: u64,
    #[arg(long, default_value = DRAWER_TRIGGER)]
    pub drawer_trigger: String,
    /// Page address, used by the URL strategy
    #[arg(long)]
    pub url: Option<String>,
}

pub fn extract(ctx: &Context<'_>, args: ExtractArgs) -> Result<()> {
    let markup = read_markup(&args.page)?;
    let location = parse_location(args.url.as_deref().unwrap_or(DEFAULT_LOCATION))?;
    let page = Rc::new(ScriptedPage::new(markup).with_location(location));

    if let Some(drawer) = args.drawer.as_deref() {
        let drawer_markup = read_markup(drawer)?;
        page.on_click(
            &args.drawer_trigger,
            Duration::from_millis(args.drawer_delay_ms),
            drawer_markup,
        )
        .with_context(|| "register drawer render")?;
    }

    let notifier = Rc::new(MemoryNotifier::new());
    let orchestrator = Orchestrator::new(ctx.config.clone(), page.clone(), notifier);
    let outcome = runtime()?.block_on(orchestrator.run_cycle(TriggerReason::Manual));
    debug!(clicks = page.click_count(), "cycle finished");

    if ctx.json {
        let report = CycleReport::from_outcome(&outcome, ctx.config.extraction.dedup_suffix_len);
        print_json(&report)?;
    }

    match outcome {
        CycleOutcome::Emitted(emission) => {
            if !ctx.json {
                println!("{}", emission.identifier);
            }
            Ok(())
        }
        _ => Err(not_found("no phone identifier on page")),
    }
}
