//! MT/NPI command link to an 802.15.4 co-processor over a framed serial
//! line.
//!
//! Inbound bytes are assembled into checksummed frames, classified, and
//! fanned out: synchronous responses feed a dedicated queue drained by the
//! correlator, asynchronous events go through a per-link handler registry.
//! Outbound, subsystem wrappers (SYS, UTIL) encode typed requests and block
//! on the correlator until the matching response arrives or the retry
//! budget runs out.

pub mod config;
pub mod correlator;
pub mod error;
pub mod link;
pub mod router;
pub mod status;
pub mod sys;
pub mod util;

pub use config::LinkConfig;
pub use correlator::SrspCorrelator;
pub use error::{LinkError, Result};
pub use link::NpiLink;
pub use router::{HandlerRegistry, Router};
pub use status::MtStatus;
pub use sys::{NvItem, ResetInd, ResetType, Sys, SysEvents, Version};
pub use util::{ExtAddr, Util};

pub use npilink_frame::{CmdType, Frame, Subsystem};
pub use npilink_transport::NpiStream;
