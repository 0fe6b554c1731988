use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use npilink::{HandlerRegistry, LinkConfig, NpiLink, NpiStream};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod ext_addr;
pub mod ping;
pub mod random;
pub mod reset;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ping the co-processor and print its capability bitmap.
    Ping(LinkArgs),
    /// Query the co-processor stack version.
    Version(LinkArgs),
    /// Ask the co-processor for a random number.
    Random(LinkArgs),
    /// Read the co-processor's extended IEEE address.
    ExtAddr(ext_addr::ExtAddrArgs),
    /// Request a co-processor reset.
    Reset(reset::ResetArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format),
        Command::Version(args) => version::run(args, format),
        Command::Random(args) => random::run(args, format),
        Command::ExtAddr(args) => ext_addr::run(args, format),
        Command::Reset(args) => reset::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device or socket path (e.g. /dev/ttyS2).
    pub path: PathBuf,

    /// Treat the path as a Unix domain socket instead of a device node.
    #[arg(long)]
    pub uds: bool,

    /// Synchronous-response retry count.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Wait per retry (e.g. 50ms, 1s).
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,
}

impl LinkArgs {
    pub fn open(&self) -> CliResult<NpiLink> {
        self.open_with_registry(HandlerRegistry::new())
    }

    pub fn open_with_registry(&self, registry: HandlerRegistry) -> CliResult<NpiLink> {
        let stream = if self.uds {
            NpiStream::connect_socket(&self.path)
        } else {
            NpiStream::open_device(&self.path)
        }
        .map_err(|err| transport_error("open failed", err))?;

        let mut config = LinkConfig::default();
        if let Some(retries) = self.retries {
            if retries == 0 {
                return Err(CliError::new(USAGE, "retries must be greater than zero"));
            }
            config.srsp_retry_count = retries;
        }
        if let Some(interval) = &self.interval {
            config.srsp_poll_interval = parse_duration(interval)?;
        }

        NpiLink::start_with_config(stream, registry, config)
            .map_err(|err| crate::exit::link_error("link start failed", err))
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "interval must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid interval value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "interval must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("50ms").unwrap(), Duration::from_millis(50));
        assert_eq!(parse_duration("50").unwrap(), Duration::from_millis(50));
    }

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }
}
