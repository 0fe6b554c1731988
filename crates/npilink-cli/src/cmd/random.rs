use serde::Serialize;

use crate::cmd::LinkArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Serialize)]
struct RandomOutput {
    value: u16,
}

pub fn run(args: LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let link = args.open()?;
    let value = link
        .util()
        .random()
        .map_err(|err| link_error("random query failed", err))?;

    emit(&RandomOutput { value }, format, |out| out.value.to_string());
    Ok(SUCCESS)
}
