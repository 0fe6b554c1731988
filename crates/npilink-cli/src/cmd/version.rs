use crate::cmd::LinkArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

pub fn run(args: LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let link = args.open()?;
    let version = link
        .sys()
        .version()
        .map_err(|err| link_error("version query failed", err))?;

    emit(&version, format, |v| {
        format!(
            "stack {}.{}.{} (transport {}, product {})",
            v.major, v.minor, v.maint, v.transport, v.product
        )
    });
    Ok(SUCCESS)
}
