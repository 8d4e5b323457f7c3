//! Transfer protocols layered on top of `Framer`: the single-record and
//! multi-record group transfers (`A1xx`/`A2xx`/...), the `A600` one-shot
//! date/time exchange, the `A800` PVT stream, and the fire-and-forget
//! abort/power-off commands. Grounded on `dev_garmin.py`'s
//! `TransferProtocol`/`SingleTransferProtocol`/`MultiTransferProtocol`/`A600`/
//! `A800` classes.

use thiserror::Error;
use tracing::{debug, trace};

use crate::capability::CapabilityError;
use crate::codec::CodecError;
use crate::framing::LinkError;
use crate::records::time::D600;
use crate::registry::{self, AnyRecord, RegistryError};
use crate::transport::{PacketTransport, TransportError};

/// The link layer's packet-id assignments, which differ between `L001` and
/// `L002`; negotiated once per session from [`crate::capability::Capabilities::link`]
/// and threaded through every transfer call below. Grounded on
/// `dev_garmin.py`'s `L001`/`L002` classes.
#[derive(Clone, Copy, Debug)]
pub struct PidTable {
    pub command_data: u8,
    pub xfer_cmplt: u8,
    pub date_time_data: u8,
    pub position_data: u8,
    pub prx_wpt_data: u8,
    pub records: u8,
    pub rte_hdr: u8,
    pub rte_wpt_data: u8,
    pub almanac_data: u8,
    pub trk_data: u8,
    pub wpt_data: u8,
    pub pvt_data: u8,
    pub rte_link_data: u8,
    pub trk_hdr: u8,
    pub flightbook_record: u8,
    pub lap: u8,
}

pub const L001: PidTable = PidTable {
    command_data: 10,
    xfer_cmplt: 12,
    date_time_data: 14,
    position_data: 17,
    prx_wpt_data: 19,
    records: 27,
    rte_hdr: 29,
    rte_wpt_data: 30,
    almanac_data: 31,
    trk_data: 34,
    wpt_data: 35,
    pvt_data: 51,
    rte_link_data: 98,
    trk_hdr: 99,
    flightbook_record: 134,
    lap: 149,
};

/// `L002` devices are older units that never advertise tracks, PVT, laps or
/// flightbook categories; those fields aren't defined in the wire spec for
/// this table and are carried over from [`L001`] as unreachable placeholders.
pub const L002: PidTable = PidTable {
    command_data: 11,
    xfer_cmplt: 12,
    date_time_data: 20,
    position_data: 24,
    prx_wpt_data: 27,
    records: 35,
    rte_hdr: 37,
    rte_wpt_data: 39,
    almanac_data: 4,
    trk_data: L001.trk_data,
    wpt_data: 43,
    pvt_data: L001.pvt_data,
    rte_link_data: L001.rte_link_data,
    trk_hdr: L001.trk_hdr,
    flightbook_record: L001.flightbook_record,
    lap: L001.lap,
};

/// Look up the [`PidTable`] for a negotiated link protocol name such as
/// `"L001"` or `"L002"`.
pub fn pid_table_for(link: &str) -> Option<PidTable> {
    match link {
        "L001" => Some(L001),
        "L002" => Some(L002),
        _ => None,
    }
}

/// Device Command Protocol 1/2 command ids (`A010`/`A011`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    AbortTransfer = 0,
    TransferAlm = 4,
    TransferPosn = 11,
    TransferPrx = 17,
    TransferRte = 8,
    TransferTime = 20,
    TransferTrk = 6,
    TransferWpt = 21,
    TurnOffPwr = 26,
    PvtDataOn = 49,
    PvtDataOff = 50,
    TransferLaps = 117,
    TransferRuns = 122,
    FlightbookTransfer = 92,
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("record codec error")]
    Codec(#[from] CodecError),
    #[error("record registry error")]
    Registry(#[from] RegistryError),
    #[error("capability negotiation error")]
    Capability(#[from] CapabilityError),
    #[error("expected a header record before point record with tag {0:?}")]
    HeaderExpected(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Progress callback invoked after each record; `(index, total)` are 1-based.
pub type ProgressFn<'a> = dyn FnMut(usize, usize) + 'a;

fn send_command<C: PacketTransport>(channel: &mut C, pids: &PidTable, cmd: Command) -> Result<()> {
    let mut payload = Vec::with_capacity(2);
    payload.extend_from_slice(&(cmd as u16).to_le_bytes());
    channel.send_packet(pids.command_data, &payload)?;
    Ok(())
}

/// Abort whatever transfer is in progress. Fire-and-forget: no reply is
/// expected.
pub fn abort_transfer<C: PacketTransport>(channel: &mut C, pids: &PidTable) -> Result<()> {
    send_command(channel, pids, Command::AbortTransfer)
}

/// Ask the device to power itself off. Fire-and-forget.
pub fn turn_power_off<C: PacketTransport>(channel: &mut C, pids: &PidTable) -> Result<()> {
    send_command(channel, pids, Command::TurnOffPwr)
}

/// Download a single flat group of records of one tag (waypoints, almanac,
/// proximity waypoints, ...): `Pid_Command_Data` -> `Pid_Records` -> N
/// records of `tag` arriving as `data_ptype` -> `Pid_Xfer_Cmplt`.
pub fn get_single<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
    cmd: Command,
    data_ptype: u8,
    tag: &str,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<Vec<AnyRecord>> {
    send_command(channel, pids, cmd)?;
    let records_payload = channel.expect_packet(pids.records)?;
    let numrecords = read_records_count(&records_payload)?;
    trace!(numrecords, tag, "expecting records");

    let mut result = Vec::with_capacity(numrecords);
    for i in 0..numrecords {
        let payload = channel.expect_packet(data_ptype)?;
        let record = registry::decode(tag, &payload)?;
        result.push(record);
        if let Some(cb) = progress.as_deref_mut() {
            cb(i + 1, numrecords);
        }
    }
    channel.expect_packet(pids.xfer_cmplt)?;
    Ok(result)
}

/// Upload a single flat group of records: mirror of [`get_single`].
pub fn put_single<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
    cmd: Command,
    data_ptype: u8,
    records: &[AnyRecord],
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<()> {
    let numrecords = records.len();
    channel.send_packet(pids.records, &(numrecords as u16).to_le_bytes())?;
    for (i, record) in records.iter().enumerate() {
        channel.send_packet(data_ptype, &record.encode()?)?;
        if let Some(cb) = progress.as_deref_mut() {
            cb(i + 1, numrecords);
        }
    }
    channel.send_packet(pids.xfer_cmplt, &(cmd as u16).to_le_bytes())?;
    Ok(())
}

fn read_records_count(payload: &[u8]) -> Result<usize> {
    if payload.len() < 2 {
        return Err(TransferError::Transport(TransportError::Link(
            LinkError::Malformed("Pid_Records payload shorter than 2 bytes"),
        )));
    }
    Ok(u16::from_le_bytes([payload[0], payload[1]]) as usize)
}

/// One group within a multi-record transfer: a header record followed by
/// zero or more point records belonging to it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordGroup {
    pub header: AnyRecord,
    pub points: Vec<AnyRecord>,
}

/// Download a multi-record transfer (routes, tracks, runs): a header record
/// of `hdr_tag` opens each group, followed by zero or more point records
/// whose tag is in `point_tags`. `hdr_ptype` distinguishes a header packet
/// from a point packet on the wire; the point's concrete tag still has to be
/// resolved by trying each candidate schema, since a single point `ptype`
/// (e.g. `Pid_Rte_Wpt_Data`) can carry more than one negotiated `Dxxx` shape.
pub fn get_multi<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
    cmd: Command,
    hdr_ptype: u8,
    hdr_tag: &str,
    point_tags: &[&str],
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<Vec<RecordGroup>> {
    send_command(channel, pids, cmd)?;
    let records_payload = channel.expect_packet(pids.records)?;
    let numrecords = read_records_count(&records_payload)?;
    trace!(numrecords, hdr_tag, "expecting multi-record groups");

    let mut result = Vec::new();
    let mut current: Option<RecordGroup> = None;

    for i in 0..numrecords {
        let (ptype, payload) = channel.read_packet()?;

        if ptype == hdr_ptype {
            if let Some(group) = current.take() {
                result.push(group);
            }
            current = Some(RecordGroup {
                header: registry::decode(hdr_tag, &payload)?,
                points: Vec::new(),
            });
        } else {
            let tag = resolve_point_tag(&payload, point_tags)?;
            let group = current
                .as_mut()
                .ok_or_else(|| TransferError::HeaderExpected(tag.to_string()))?;
            group.points.push(registry::decode(tag, &payload)?);
        }

        if let Some(cb) = progress.as_deref_mut() {
            cb(i + 1, numrecords);
        }
    }
    channel.expect_packet(pids.xfer_cmplt)?;
    if let Some(group) = current.take() {
        result.push(group);
    }
    Ok(result)
}

/// Pick the one schema in `point_tags` whose fixed-width decode matches
/// `payload`'s length. Garmin's point schemas within a category never share
/// a wire length, so this is unambiguous.
fn resolve_point_tag<'a>(payload: &[u8], point_tags: &'a [&'a str]) -> Result<&'a str> {
    for &tag in point_tags {
        if registry::decode(tag, payload).is_ok() {
            return Ok(tag);
        }
    }
    Err(TransferError::HeaderExpected(format!(
        "no schema in {point_tags:?} accepted a {}-byte payload",
        payload.len()
    )))
}

/// Upload a multi-record transfer: mirror of [`get_multi`], flattening
/// groups back into header-then-points order.
pub fn put_multi<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
    cmd: Command,
    hdr_ptype: u8,
    point_ptype: u8,
    groups: &[RecordGroup],
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<()> {
    let numrecords: usize = groups.iter().map(|g| 1 + g.points.len()).sum();
    channel.send_packet(pids.records, &(numrecords as u16).to_le_bytes())?;

    let mut sent = 0;
    for group in groups {
        channel.send_packet(hdr_ptype, &group.header.encode()?)?;
        sent += 1;
        if let Some(cb) = progress.as_deref_mut() {
            cb(sent, numrecords);
        }
        for point in &group.points {
            channel.send_packet(point_ptype, &point.encode()?)?;
            sent += 1;
            if let Some(cb) = progress.as_deref_mut() {
                cb(sent, numrecords);
            }
        }
    }
    channel.send_packet(pids.xfer_cmplt, &(cmd as u16).to_le_bytes())?;
    Ok(())
}

/// `A600`: one-shot request/reply for the device's current date and time,
/// no `Pid_Records`/`Pid_Xfer_Cmplt` envelope.
pub fn get_time<C: PacketTransport>(channel: &mut C, pids: &PidTable) -> Result<D600> {
    send_command(channel, pids, Command::TransferTime)?;
    let payload = channel.expect_packet(pids.date_time_data)?;
    Ok(registry::decode("D600", &payload).and_then(|r| match r {
        AnyRecord::D600(d) => Ok(d),
        other => Err(RegistryError::UnknownTag(other.tag().to_string())),
    })?)
}

/// `A700`: position-initialisation one-shot, no `Pid_Records`/
/// `Pid_Xfer_Cmplt` envelope. Mirrors [`get_time`].
pub fn get_position<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
) -> Result<crate::records::position::D700> {
    send_command(channel, pids, Command::TransferPosn)?;
    let payload = channel.expect_packet(pids.position_data)?;
    Ok(registry::decode("D700", &payload).and_then(|r| match r {
        AnyRecord::D700(d) => Ok(d),
        other => Err(RegistryError::UnknownTag(other.tag().to_string())),
    })?)
}

/// Tell the device to start pushing `Pid_Pvt_Data` packets on its own
/// schedule. Fire-and-forget; no ACK is expected on either side above the
/// framing layer.
pub fn pvt_on<C: PacketTransport>(channel: &mut C, pids: &PidTable) -> Result<()> {
    send_command(channel, pids, Command::PvtDataOn)
}

/// Stop the `A800` stream started by [`pvt_on`]. Fire-and-forget.
pub fn pvt_off<C: PacketTransport>(channel: &mut C, pids: &PidTable) -> Result<()> {
    send_command(channel, pids, Command::PvtDataOff)
}

/// Read the next `D800` sample from an active `A800` stream.
pub fn read_pvt<C: PacketTransport>(
    channel: &mut C,
    pids: &PidTable,
) -> Result<crate::records::pvt::D800> {
    let payload = channel.expect_packet(pids.pvt_data)?;
    Ok(registry::decode("D800", &payload).and_then(|r| match r {
        AnyRecord::D800(d) => Ok(d),
        other => Err(RegistryError::UnknownTag(other.tag().to_string())),
    })?)
}

/// `A800`: live position/velocity/time stream, scoped to a borrow of the
/// channel so it can't be read from once disabled. Callers who don't need
/// that scoping can call [`pvt_on`]/[`read_pvt`]/[`pvt_off`] directly.
pub struct PvtStream<'f, C> {
    channel: &'f mut C,
    pids: PidTable,
}

impl<'f, C: PacketTransport> PvtStream<'f, C> {
    /// Enable streaming. The device starts pushing `Pid_Pvt_Data` packets on
    /// its own schedule; callers should raise the link's read timeout (the
    /// device's natural cadence is close to the default 1s one) before
    /// calling [`read_pvt`](Self::read_pvt) in a loop.
    pub fn enable(channel: &'f mut C, pids: PidTable) -> Result<Self> {
        pvt_on(channel, &pids)?;
        Ok(Self { channel, pids })
    }

    /// Read the next `D800` sample.
    pub fn read_pvt(&mut self) -> Result<crate::records::pvt::D800> {
        read_pvt(self.channel, &self.pids)
    }

    /// Disable streaming. Fire-and-forget.
    pub fn disable(self) -> Result<()> {
        pvt_off(self.channel, &self.pids)
    }
}

/// Renumber route headers sequentially starting at 1 and substitute the
/// device's defaults (blank `ident`/`cmnt`) the way products that
/// auto-number routes on upload expect. Grounded on `dev_garmin.py`'s
/// `A200`/`D200` group together with `garmin.py`'s default-route-name
/// convention (`routenr` is incremented before its first use, so the first
/// uploaded route is numbered 1).
pub fn prepare_route_upload(groups: &mut [RecordGroup]) {
    for (i, group) in groups.iter_mut().enumerate() {
        let n = i + 1;
        match &mut group.header {
            AnyRecord::D200(h) => h.route_num = n as i8,
            AnyRecord::D201(h) => {
                h.route_num = n as i8;
                if h.cmnt.trim().is_empty() {
                    h.cmnt = format!("ROUTE {n}");
                }
            }
            AnyRecord::D202(h) => {
                if h.ident.trim().is_empty() {
                    h.ident = format!("ROUTE {n}");
                }
            }
            _ => debug!("prepare_route_upload: unrecognised header variant, leaving as-is"),
        }
    }
}

/// Ensure every track segment after the first is flagged `new_trk` so the
/// device doesn't stitch unrelated segments into one continuous track.
/// Grounded on `dev_garmin.py`'s `D300`/`TrkHdr` handling; covers both
/// negotiated track-point schemas (`D300`, `D301`).
pub fn prepare_track_upload(points: &mut [AnyRecord]) {
    let mut first = true;
    for point in points {
        let new_trk = match point {
            AnyRecord::D300(p) => Some(&mut p.new_trk),
            AnyRecord::D301(p) => Some(&mut p.new_trk),
            _ => None,
        };
        if let Some(new_trk) = new_trk {
            *new_trk = first;
            first = false;
        }
    }
}
