use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected byte stream to the co-processor, implementing Read + Write.
///
/// This is the fundamental I/O type the frame layer runs over. The usual
/// production form is a serial device node (the co-processor UART exposed by
/// the kernel); Unix domain sockets cover socat-style serial bridges and
/// in-process test harnesses.
pub struct NpiStream {
    inner: NpiStreamInner,
}

enum NpiStreamInner {
    Device(File),
    Unix(UnixStream),
}

impl NpiStream {
    /// Open a serial device node read/write (e.g. `/dev/ttyACM0`).
    ///
    /// Line discipline (baud rate, raw mode) is assumed to be configured by
    /// the platform before the link is started.
    pub fn open_device(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| TransportError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "opened serial device");
        Ok(Self {
            inner: NpiStreamInner::Device(file),
        })
    }

    /// Connect to a Unix domain socket bridging the serial line.
    pub fn connect_socket(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to socket transport");
        Ok(Self {
            inner: NpiStreamInner::Unix(stream),
        })
    }

    /// Create a connected stream pair, one end per role.
    ///
    /// The second stream stands in for the co-processor in tests.
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = UnixStream::pair()?;
        Ok((Self::from_unix(a), Self::from_unix(b)))
    }

    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self {
            inner: NpiStreamInner::Unix(stream),
        }
    }

    /// Set a read timeout on the underlying stream.
    ///
    /// Supported on socket transports; serial device reads block until the
    /// line delivers data, which is the behavior the receive pump expects.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            NpiStreamInner::Device(_) => Ok(()),
            NpiStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (new file descriptor, shared endpoint).
    ///
    /// The link layer uses one clone for the receive pump and one for writes.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            NpiStreamInner::Device(file) => {
                let cloned = file.try_clone()?;
                Ok(Self {
                    inner: NpiStreamInner::Device(cloned),
                })
            }
            NpiStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
        }
    }

    /// Shut down the socket transport, unblocking a pending read.
    ///
    /// No-op for serial devices; closing the last descriptor ends reads there.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            NpiStreamInner::Device(_) => Ok(()),
            NpiStreamInner::Unix(stream) => stream
                .shutdown(std::net::Shutdown::Both)
                .map_err(Into::into),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            NpiStreamInner::Device(_) => "serial-device",
            NpiStreamInner::Unix(_) => "unix-socket",
        }
    }
}

impl Read for NpiStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            NpiStreamInner::Device(file) => file.read(buf),
            NpiStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for NpiStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            NpiStreamInner::Device(file) => file.write(buf),
            NpiStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            NpiStreamInner::Device(file) => file.flush(),
            NpiStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for NpiStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpiStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
