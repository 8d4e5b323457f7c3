//! Byte-level device transports: serial (framed by [`crate::framing`]) and,
//! behind the `usb` feature, USB bulk endpoints which deliver whole packets
//! without DLE stuffing.

use std::io::Read;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::framing::{ByteIo, Framer, LinkError};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const PVT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to open device {path:?}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("device I/O error")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "usb")]
    #[error("USB transport error")]
    Usb(#[from] rusb::Error),
    #[error("link error")]
    Link(#[from] LinkError),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// The abstract `(type, payload)` packet channel every session operation is
/// written against, so the rest of the crate doesn't care whether it's
/// talking to framed serial or raw USB bulk transfers underneath. Serial
/// wraps [`crate::framing::Framer`] (DLE framing, checksum, ACK/NAK); USB
/// implements this directly since it delivers whole packets.
pub trait PacketTransport {
    fn send_packet(&mut self, ptype: u8, payload: &[u8]) -> Result<()>;
    fn read_packet(&mut self) -> Result<(u8, Vec<u8>)>;
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Read packets until one of type `ptype` arrives, erroring on the first
    /// mismatch -- there is no re-sync concept above the framing layer.
    fn expect_packet(&mut self, ptype: u8) -> Result<Vec<u8>> {
        let (got, payload) = self.read_packet()?;
        if got != ptype {
            return Err(TransportError::Link(LinkError::UnexpectedType {
                expected: ptype,
                actual: got,
            }));
        }
        Ok(payload)
    }
}

impl<T: ByteIo> PacketTransport for Framer<T> {
    fn send_packet(&mut self, ptype: u8, payload: &[u8]) -> Result<()> {
        Ok(Framer::send_packet(self, ptype, payload)?)
    }

    fn read_packet(&mut self) -> Result<(u8, Vec<u8>)> {
        let packet = Framer::read_packet(self)?;
        Ok((packet.ptype, packet.payload))
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        Ok(Framer::set_timeout(self, timeout)?)
    }
}

/// Serial transport: 9600 8-N-1, no flow control. Framing is the caller's
/// responsibility via [`crate::framing::Framer`].
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::Open {
                path: path.to_string(),
                source: std::io::Error::other(e),
            })?;
        debug!(path, baud_rate, "opened serial transport");
        Ok(Self { port })
    }
}

impl ByteIo for SerialTransport {
    fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        std::io::Write::write_all(&mut self.port, buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.port.set_timeout(timeout).map_err(std::io::Error::other)
    }
}

/// USB bulk transport, built against `rusb`. Each `read_packet` call reads
/// one bulk transfer and interprets its first two bytes as the little-endian
/// packet type, the remainder as payload -- there is no DLE stuffing, no
/// checksum, and no ACK/NAK on this path.
#[cfg(feature = "usb")]
pub struct UsbTransport {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
    in_endpoint: u8,
    out_endpoint: u8,
    timeout: Duration,
}

#[cfg(feature = "usb")]
impl UsbTransport {
    pub fn open(
        vendor_id: u16,
        product_id: u16,
        in_endpoint: u8,
        out_endpoint: u8,
    ) -> Result<Self> {
        let handle = rusb::open_device_with_vid_pid(vendor_id, product_id)
            .ok_or(rusb::Error::NoDevice)?;
        Ok(Self {
            handle,
            in_endpoint,
            out_endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

#[cfg(feature = "usb")]
impl PacketTransport for UsbTransport {
    fn send_packet(&mut self, ptype: u8, payload: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(payload.len() + 2);
        buf.extend_from_slice(&(ptype as u16).to_le_bytes());
        buf.extend_from_slice(payload);
        self.handle.write_bulk(self.out_endpoint, &buf, self.timeout)?;
        Ok(())
    }

    fn read_packet(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut buf = vec![0u8; 4096];
        let n = self.handle.read_bulk(self.in_endpoint, &mut buf, self.timeout)?;
        if n < 2 {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short USB read",
            )));
        }
        let ptype = u16::from_le_bytes([buf[0], buf[1]]) as u8;
        Ok((ptype, buf[2..n].to_vec()))
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}
