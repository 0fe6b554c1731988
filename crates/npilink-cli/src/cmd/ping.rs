use serde::Serialize;

use crate::cmd::LinkArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    capabilities: u16,
}

pub fn run(args: LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let link = args.open()?;
    let capabilities = link
        .sys()
        .ping()
        .map_err(|err| link_error("ping failed", err))?;

    emit(&PingOutput { capabilities }, format, |out| {
        format!("capabilities: {:#06x}", out.capabilities)
    });
    Ok(SUCCESS)
}
