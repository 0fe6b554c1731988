use std::collections::HashMap;

use crossbeam::channel::{Sender, TrySendError};
use npilink_frame::{CmdType, Frame, Subsystem};
use tracing::{debug, warn};

use crate::error::{LinkError, Result};

/// Handler invoked for inbound AREQ frames of one (subsystem, opcode) pair.
pub type AreqHandler = Box<dyn Fn(&Frame) + Send + Sync>;

/// Registry of AREQ handlers, keyed by subsystem code and opcode.
///
/// Owned by the link instance, not process-wide, so independent links can
/// carry independent handler sets. Subsystem modules provide typed
/// registration helpers that decode the payload before invoking user code.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(u8, u8), AreqHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event. A later registration for the same
    /// (subsystem, opcode) replaces the earlier one.
    pub fn register(
        &mut self,
        subsystem: Subsystem,
        opcode: u8,
        handler: impl Fn(&Frame) + Send + Sync + 'static,
    ) {
        self.handlers
            .insert((subsystem.code(), opcode), Box::new(handler));
    }

    /// Dispatch an inbound event frame to its registered handler.
    ///
    /// Events without a handler are dropped after a log entry; AREQs are
    /// fire-and-forget, so absence of a handler is not an error. A frame
    /// marked SRSP reaching this path means the peer (or a queue) misrouted
    /// a response; it is logged and never handed to a handler.
    pub fn dispatch(&self, frame: &Frame) {
        if frame.cmd_type() == CmdType::Srsp {
            warn!(
                cmd0 = format_args!("{:#04x}", frame.cmd0),
                cmd1 = format_args!("{:#04x}", frame.cmd1),
                "synchronous response on event path, dropped"
            );
            return;
        }
        match self.handlers.get(&(frame.subsystem_code(), frame.opcode())) {
            Some(handler) => handler(frame),
            None => debug!(
                subsystem = frame.subsystem_code(),
                opcode = format_args!("{:#04x}", frame.opcode()),
                "no handler for event, dropped"
            ),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Classifies validated inbound frames onto the link's two queues.
///
/// SRSP frames go to the dedicated response queue consumed by the
/// correlator; everything else goes to the event queue consumed by the
/// dispatch thread. Queue-full is reported, not fatal.
#[derive(Debug, Clone)]
pub struct Router {
    srsp_tx: Sender<Frame>,
    event_tx: Sender<Frame>,
}

impl Router {
    pub fn new(srsp_tx: Sender<Frame>, event_tx: Sender<Frame>) -> Self {
        Self { srsp_tx, event_tx }
    }

    pub fn route(&self, frame: Frame) -> Result<()> {
        match frame.cmd_type() {
            CmdType::Srsp => self.srsp_tx.try_send(frame).map_err(|err| match err {
                TrySendError::Full(_) => LinkError::SrspQueueFull,
                TrySendError::Disconnected(_) => LinkError::Closed,
            }),
            _ => self.event_tx.try_send(frame).map_err(|err| match err {
                TrySendError::Full(_) => LinkError::EventQueueFull,
                TrySendError::Disconnected(_) => LinkError::Closed,
            }),
        }
    }
}
