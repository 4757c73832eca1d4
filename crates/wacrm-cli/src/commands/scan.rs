use crate::commands::{print_json, Context};
use crate::error::not_found;
use anyhow::Result;
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Free text to search; multiple words are joined with spaces
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MobileMatch {
    digits: String,
    local: String,
}

pub fn scan(ctx: &Context<'_>, args: ScanArgs) -> Result<()> {
    let text = args.text.join(" ");
    let plan = &ctx.config.number_plan;
    let matches: Vec<MobileMatch> = plan
        .find_mobiles(&text)
        .into_iter()
        .map(|digits| MobileMatch {
            local: plan.to_local_format(&digits),
            digits,
        })
        .collect();

    if ctx.json {
        print_json(&matches)?;
    } else {
        for item in &matches {
            println!("{}  {}", item.digits, item.local);
        }
    }

    if matches.is_empty() {
        return Err(not_found("no mobile numbers in text"));
    }
    Ok(())
}
