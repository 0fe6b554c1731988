use clap::Args;

use crate::cmd::LinkArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Args, Debug)]
pub struct ExtAddrArgs {
    #[command(flatten)]
    pub link: LinkArgs,

    /// Address source to read (0 = factory, 1 = user NV, 2 = currently in use).
    #[arg(long = "type", value_name = "N", default_value = "2")]
    pub addr_type: u8,
}

pub fn run(args: ExtAddrArgs, format: OutputFormat) -> CliResult<i32> {
    let link = args.link.open()?;
    let addr = link
        .util()
        .get_ext_addr(args.addr_type)
        .map_err(|err| link_error("extended address query failed", err))?;

    emit(&addr, format, |a| {
        // Wire order is little-endian; print most significant byte first.
        let hex = a
            .address
            .iter()
            .rev()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        format!("type {}: {hex}", a.addr_type)
    });
    Ok(SUCCESS)
}
