//! L000/L001/L002 link layer: DLE/ETX byte-stuffed packet framing.
//!
//! Packets on the wire look like `DLE TYPE LEN DATA... CHK DLE ETX`, with any
//! `DLE` byte inside `LEN`/`DATA`/`CHK` doubled. See [`Framer`].

use std::io::{Read, Write};
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use tracing::{debug, trace, warn};

const DLE: u8 = 0x10;
const ETX: u8 = 0x03;

pub const PID_ACK_BYTE: u8 = 6;
pub const PID_NAK_BYTE: u8 = 21;

/// Undocumented packet type some devices interleave; silently discarded.
const PID_STRAY_248: u8 = 248;

const MAX_RETRIES_ON_NAK: u32 = 2;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },
    #[error("expected packet type {expected}, got {actual}")]
    UnexpectedType { expected: u8, actual: u8 },
    #[error("device rejected packet type {0} with NAK")]
    Nak(u8),
    #[error("malformed framing: {0}")]
    Malformed(&'static str),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// A decoded link-layer packet: its type id and unescaped payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub ptype: u8,
    pub payload: Vec<u8>,
}

/// Byte-level transport the framer reads from and writes to.
///
/// Implemented by [`crate::transport::SerialTransport`] for the wire format
/// below; a USB transport bypasses `Framer` entirely since USB delivers
/// whole packets without DLE stuffing.
pub trait ByteIo {
    fn read_byte(&mut self) -> std::io::Result<u8>;
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
    fn set_timeout(&mut self, timeout: Duration) -> std::io::Result<()>;
}

impl<T: ByteIo + ?Sized> ByteIo for &mut T {
    fn read_byte(&mut self) -> std::io::Result<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        (**self).write_all(buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        (**self).set_timeout(timeout)
    }
}

/// Implements the L000 link protocol's escape, checksum, and ACK/NAK rules.
/// `PID_TABLE` differences between L001 and L002 live in
/// [`crate::capability`]'s packet id tables, not here: the framing algorithm
/// itself is identical between the two.
pub struct Framer<T> {
    io: T,
}

impl<T: ByteIo> Framer<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.io.set_timeout(timeout)?;
        Ok(())
    }

    /// Send a packet and wait for its ACK, retrying a bounded number of
    /// times if the device NAKs.
    pub fn send_packet(&mut self, ptype: u8, payload: &[u8]) -> Result<()> {
        let mut attempts = 0;
        loop {
            self.write_packet(ptype, payload)?;
            match self.read_ack_or_nak(ptype) {
                Ok(()) => return Ok(()),
                Err(LinkError::Nak(_)) if attempts < MAX_RETRIES_ON_NAK => {
                    attempts += 1;
                    warn!(ptype, attempts, "retrying after NAK");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a packet without waiting for an ACK. Used only to send the ACK
    /// itself, and for the PVT stream where the device doesn't ACK data.
    pub fn send_packet_no_ack(&mut self, ptype: u8, payload: &[u8]) -> Result<()> {
        self.write_packet(ptype, payload)
    }

    fn write_packet(&mut self, ptype: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > u8::MAX as usize {
            return Err(LinkError::Malformed("payload exceeds 255 bytes"));
        }
        let len = payload.len() as u8;
        let checksum = compute_checksum(ptype, payload);

        let mut body = Vec::with_capacity(payload.len() + 2);
        body.push(len);
        body.extend_from_slice(payload);
        body.push(checksum);
        let escaped = escape(&body);

        let mut frame = Vec::with_capacity(escaped.len() + 4);
        frame.push(DLE);
        frame.push(ptype);
        frame.extend_from_slice(&escaped);
        frame.push(DLE);
        frame.push(ETX);

        trace!(ptype, len, "sending packet");
        self.io.write_all(&frame)?;
        Ok(())
    }

    fn read_ack_or_nak(&mut self, acked_type: u8) -> Result<()> {
        let packet = self.read_packet_raw(false)?;
        let mut reader = packet.payload.as_slice();
        let ptype = reader.read_u16::<LittleEndian>().unwrap_or(0) as u8;
        match packet.ptype {
            t if t == PID_ACK_BYTE => {
                if ptype != acked_type {
                    return Err(LinkError::UnexpectedType {
                        expected: acked_type,
                        actual: ptype,
                    });
                }
                Ok(())
            }
            t if t == PID_NAK_BYTE => Err(LinkError::Nak(ptype)),
            t => Err(LinkError::UnexpectedType {
                expected: PID_ACK_BYTE,
                actual: t,
            }),
        }
    }

    /// Read the next packet, sending an ACK in reply (normal inbound data).
    pub fn read_packet(&mut self) -> Result<Packet> {
        self.read_packet_raw(true)
    }

    fn read_packet_raw(&mut self, ack: bool) -> Result<Packet> {
        loop {
            self.sync_to_dle()?;
            let ptype = self.io.read_byte()?;
            if ptype == ETX {
                // End-of-packet marker left over from a previous frame; resync.
                continue;
            }

            let len = self.read_escaped_byte()?;
            let mut payload = Vec::with_capacity(len as usize);
            for _ in 0..len {
                payload.push(self.read_escaped_byte()?);
            }
            let checksum = self.read_escaped_byte()?;

            let dle = self.io.read_byte()?;
            let etx = self.io.read_byte()?;
            if dle != DLE || etx != ETX {
                return Err(LinkError::Malformed("missing DLE ETX terminator"));
            }

            let expected = compute_checksum(ptype, &payload);
            if expected != checksum {
                return Err(LinkError::Checksum {
                    expected,
                    actual: checksum,
                });
            }

            if ptype == PID_STRAY_248 {
                debug!("discarding stray type-248 packet");
                continue;
            }

            if ack {
                self.send_ack(ptype)?;
            }
            return Ok(Packet { ptype, payload });
        }
    }

    /// Read a packet expected to be of a specific type, transparently
    /// skipping stray 248 packets (already handled in `read_packet_raw`) and
    /// raising a protocol-level mismatch for anything else unexpected.
    pub fn expect_packet(&mut self, ptype: u8) -> Result<Packet> {
        let packet = self.read_packet()?;
        if packet.ptype != ptype {
            return Err(LinkError::UnexpectedType {
                expected: ptype,
                actual: packet.ptype,
            });
        }
        Ok(packet)
    }

    fn send_ack(&mut self, acked_type: u8) -> Result<()> {
        let mut payload = Vec::with_capacity(2);
        payload.write_u16::<LittleEndian>(acked_type as u16)?;
        self.send_packet_no_ack(PID_ACK_BYTE, &payload)
    }

    fn sync_to_dle(&mut self) -> Result<()> {
        loop {
            let b = self.io.read_byte()?;
            if b == DLE {
                return Ok(());
            }
            trace!(byte = b, "discarding resync garbage");
        }
    }

    /// Read one byte, collapsing a doubled DLE to a single DLE.
    fn read_escaped_byte(&mut self) -> Result<u8> {
        let b = self.io.read_byte()?;
        if b == DLE {
            let b2 = self.io.read_byte()?;
            if b2 != DLE {
                return Err(LinkError::Malformed("lone DLE inside packet body"));
            }
        }
        Ok(b)
    }
}

/// Two's complement of the sum of `ptype`, `payload.len()` and `payload`,
/// modulo 256.
fn compute_checksum(ptype: u8, payload: &[u8]) -> u8 {
    let mut sum: u8 = ptype;
    sum = sum.wrapping_add(payload.len() as u8);
    for &b in payload {
        sum = sum.wrapping_add(b);
    }
    (!sum).wrapping_add(1)
}

/// Double every `DLE` byte in `data`.
fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        out.push(b);
        if b == DLE {
            out.push(DLE);
        }
    }
    out
}

/// In-memory `ByteIo` used by tests to script a device's responses.
#[cfg(test)]
pub(crate) struct MockIo {
    pub inbound: std::collections::VecDeque<u8>,
    pub outbound: Vec<u8>,
}

#[cfg(test)]
impl MockIo {
    pub fn new(inbound: Vec<u8>) -> Self {
        Self {
            inbound: inbound.into(),
            outbound: Vec::new(),
        }
    }
}

#[cfg(test)]
impl ByteIo for MockIo {
    fn read_byte(&mut self) -> std::io::Result<u8> {
        self.inbound
            .pop_front()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no more bytes"))
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.outbound.extend_from_slice(buf);
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn checksum_is_self_canceling() {
        let payload = [1u8, 2, 3];
        let chk = compute_checksum(10, &payload);
        let sum: u8 = 10u8
            .wrapping_add(payload.len() as u8)
            .wrapping_add(payload.iter().fold(0u8, |a, &b| a.wrapping_add(b)))
            .wrapping_add(chk);
        assert_eq!(sum, 0);
    }

    #[quickcheck]
    fn escape_round_trip(data: Vec<u8>) -> bool {
        unescape_for_test(&escape(&data)) == data
    }

    fn unescape_for_test(escaped: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < escaped.len() {
            out.push(escaped[i]);
            if escaped[i] == DLE {
                i += 1;
            }
            i += 1;
        }
        out
    }

    #[test]
    fn send_then_read_packet_round_trips() {
        // Build the exact bytes a peer would emit for send_packet, then feed
        // them back in as if reading from the device, followed by an ACK.
        let payload = vec![0x01, DLE, 0x02];
        let mut writer = MockIo::new(Vec::new());
        {
            let mut framer = Framer::new(&mut writer);
            framer.send_packet_no_ack(77, &payload).unwrap();
        }

        let mut reader_bytes = writer.outbound.clone();
        // Append a synthetic ACK so send_packet (if used) would succeed; here
        // we just verify read_packet decodes what was written.
        reader_bytes.truncate(reader_bytes.len());
        let mut reader = MockIo::new(reader_bytes);
        let mut framer = Framer::new(&mut reader);
        let packet = framer.read_packet().unwrap();
        assert_eq!(packet.ptype, 77);
        assert_eq!(packet.payload, payload);
    }

    #[test]
    fn stray_248_is_skipped() {
        let mut writer = MockIo::new(Vec::new());
        {
            let mut framer = Framer::new(&mut writer);
            framer.send_packet_no_ack(248, &[]).unwrap();
            framer.send_packet_no_ack(10, &[42]).unwrap();
        }
        let mut reader = MockIo::new(writer.outbound.clone());
        let mut framer = Framer::new(&mut reader);
        let packet = framer.expect_packet(10).unwrap();
        assert_eq!(packet.payload, vec![42]);
    }
}
