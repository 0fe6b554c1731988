use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use bytes::{Bytes, BytesMut};
use crossbeam::channel::bounded;
use npilink_frame::{encode_frame, CmdType, Frame, FrameAssembler, Subsystem};
use npilink_transport::NpiStream;
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::correlator::SrspCorrelator;
use crate::error::Result;
use crate::router::{HandlerRegistry, Router};
use crate::sys::Sys;
use crate::util::Util;

// Largest read the assembler can request: 255-byte length field + FCS.
const RX_BUFFER_SIZE: usize = 256;

/// A running MT/NPI link to the co-processor.
///
/// Owns the receive pump (reads exact-size chunks, assembles frames, routes
/// them) and the event dispatch thread (drains the event queue into the
/// handler registry). Outbound writes are serialized by a mutex, since the
/// serial line is a single shared resource, and synchronous requests
/// additionally hold a request lock so only one SREQ is ever outstanding.
pub struct NpiLink {
    stream: NpiStream,
    writer: Mutex<NpiStream>,
    sreq_lock: Mutex<()>,
    correlator: SrspCorrelator,
    config: LinkConfig,
    shutdown: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl NpiLink {
    /// Start a link over `stream` with default configuration.
    pub fn start(stream: NpiStream, registry: HandlerRegistry) -> Result<Self> {
        Self::start_with_config(stream, registry, LinkConfig::default())
    }

    /// Start a link over `stream` with explicit configuration.
    pub fn start_with_config(
        stream: NpiStream,
        registry: HandlerRegistry,
        config: LinkConfig,
    ) -> Result<Self> {
        let reader = stream.try_clone()?;
        let writer = stream.try_clone()?;

        let (srsp_tx, srsp_rx) = bounded(config.srsp_queue_depth);
        let (event_tx, event_rx) = bounded(config.event_queue_depth);
        let router = Router::new(srsp_tx, event_tx);
        let correlator = SrspCorrelator::new(srsp_rx, &config);
        let shutdown = Arc::new(AtomicBool::new(false));

        let pump = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("npilink-rx".into())
                .spawn(move || rx_pump(reader, router, shutdown))?
        };
        let dispatcher = std::thread::Builder::new()
            .name("npilink-events".into())
            .spawn(move || {
                for frame in event_rx.iter() {
                    registry.dispatch(&frame);
                }
                debug!("event dispatcher stopped");
            })?;

        Ok(Self {
            stream,
            writer: Mutex::new(writer),
            sreq_lock: Mutex::new(()),
            correlator,
            config,
            shutdown,
            pump: Some(pump),
            dispatcher: Some(dispatcher),
        })
    }

    /// Link configuration in effect.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// SYS subsystem commands.
    pub fn sys(&self) -> Sys<'_> {
        Sys::new(self)
    }

    /// UTIL subsystem commands.
    pub fn util(&self) -> Util<'_> {
        Util::new(self)
    }

    /// Fire a command or event onto the wire without awaiting a response.
    pub fn send_command(
        &self,
        cmd_type: CmdType,
        subsystem: Subsystem,
        opcode: u8,
        payload: &[u8],
    ) -> Result<()> {
        let frame = Frame::new(cmd_type, subsystem, opcode, Bytes::copy_from_slice(payload));
        let mut wire = BytesMut::with_capacity(frame.wire_size());
        encode_frame(&frame, &mut wire)?;

        trace!(
            cmd0 = format_args!("{:#04x}", frame.cmd0),
            cmd1 = format_args!("{:#04x}", frame.cmd1),
            len = payload.len(),
            "frame out"
        );

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&wire)?;
        writer.flush()?;
        Ok(())
    }

    /// Send a synchronous request and block until its response arrives.
    ///
    /// The blocking primitive behind every SREQ wrapper. Holds the request
    /// lock across send + await, so concurrent callers queue up rather than
    /// racing for each other's responses. Returns the SRSP payload, or
    /// `SrspTimeout` when the retry budget is exhausted.
    pub fn send_and_await(
        &self,
        subsystem: Subsystem,
        opcode: u8,
        payload: &[u8],
    ) -> Result<Bytes> {
        let _outstanding = self.sreq_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.send_command(CmdType::Sreq, subsystem, opcode, payload)?;
        let frame = self.correlator.await_srsp(opcode)?;
        Ok(frame.payload)
    }

    /// Shut down the link and join its threads.
    ///
    /// Graceful for socket transports, where shutdown unblocks the pending
    /// read. A serial device blocked in a read exits on the next byte or
    /// when the descriptor closes.
    pub fn close(mut self) -> Result<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.stream.shutdown()?;
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
        Ok(())
    }
}

impl Drop for NpiLink {
    fn drop(&mut self) {
        if self.pump.is_some() {
            let _ = self.close_inner();
        }
    }
}

impl std::fmt::Debug for NpiLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpiLink")
            .field("transport", &self.stream.transport_name())
            .field("config", &self.config)
            .finish()
    }
}

/// Receive pump: issue exact-size reads at the assembler's request, route
/// every completed frame. Exits on transport EOF/error or link shutdown.
fn rx_pump(mut stream: NpiStream, router: Router, shutdown: Arc<AtomicBool>) {
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; RX_BUFFER_SIZE];
    let mut next = assembler.initial_read();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if let Err(err) = stream.read_exact(&mut buf[..next]) {
            if !shutdown.load(Ordering::SeqCst) {
                debug!(%err, "receive pump stopped");
            }
            break;
        }
        let (request, frame) = assembler.advance(&buf[..next]);
        next = request;
        if let Some(frame) = frame {
            trace!(
                cmd0 = format_args!("{:#04x}", frame.cmd0),
                cmd1 = format_args!("{:#04x}", frame.cmd1),
                len = frame.payload.len(),
                "frame in"
            );
            if let Err(err) = router.route(frame) {
                warn!(%err, "inbound frame dropped");
            }
        }
    }
}
