use crate::commands::{print_json, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct LocalArgs {
    /// Number in any form: international, local, with separators
    pub number: String,
}

#[derive(Debug, Serialize)]
struct LocalNumber<'a> {
    input: &'a str,
    local: String,
}

pub fn local(ctx: &Context<'_>, args: LocalArgs) -> Result<()> {
    let local = ctx
        .config
        .number_plan
        .broadcast_number(&args.number)
        .with_context(|| format!("convert {} to local form", args.number))?;

    if ctx.json {
        return print_json(&LocalNumber {
            input: &args.number,
            local,
        });
    }
    println!("{local}");
    Ok(())
}
