use clap::{Args, ValueEnum};
use npilink::ResetType;
use serde::Serialize;

use crate::cmd::LinkArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ResetKind {
    Hard,
    Soft,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub link: LinkArgs,

    /// Reset kind to request.
    #[arg(long = "kind", value_enum, default_value = "soft")]
    pub kind: ResetKind,
}

#[derive(Serialize)]
struct ResetOutput {
    requested: &'static str,
}

pub fn run(args: ResetArgs, format: OutputFormat) -> CliResult<i32> {
    let (reset_type, name) = match args.kind {
        ResetKind::Hard => (ResetType::Hard, "hard"),
        ResetKind::Soft => (ResetType::Soft, "soft"),
    };

    let link = args.link.open()?;
    link.sys()
        .reset(reset_type)
        .map_err(|err| link_error("reset request failed", err))?;

    // Fire and forget: the reset indication arrives after the device reboots,
    // long after this process is useful.
    emit(&ResetOutput { requested: name }, format, |out| {
        format!("{} reset requested", out.requested)
    });
    Ok(SUCCESS)
}
