//! The session façade: binds a [`PacketTransport`] to its negotiated
//! [`Capabilities`] and [`PidTable`], and exposes one get/put pair per
//! application category. Grounded on `dev_garmin.py`'s `Garmin` class, which
//! performs the same product probe -> protocol array -> per-category
//! dispatch at construction time and then hands out `A1xx..A9xx` calls as
//! plain methods.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument};

use crate::capability::{self, CapabilityError, Capabilities, ProductInfo};
use crate::records::position::D700;
use crate::records::pvt::D800;
use crate::records::time::D600;
use crate::records::Category;
use crate::registry::AnyRecord;
use crate::transfer::{self, Command, PidTable, RecordGroup, TransferError};
use crate::transport::{self, PacketTransport, SerialTransport, TransportError};
use crate::framing::Framer;

#[cfg(feature = "usb")]
use crate::transport::UsbTransport;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("capability negotiation error")]
    Capability(#[from] CapabilityError),
    #[error("transfer error")]
    Transfer(#[from] TransferError),
    #[error("device didn't advertise a link protocol")]
    MissingLink,
    #[error("device advertised unrecognised link protocol {0:?}")]
    UnknownLink(String),
    #[error("device doesn't support the {0} category")]
    UnsupportedCategory(Category),
    #[error("device didn't report a unit identifier")]
    MissingUnitId,
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub use transfer::ProgressFn;

/// Device path, baud rate, and I/O timeout for a serial session. Mirrors the
/// library/CLI split the teacher draws between its library options and
/// `src/bin/cli.rs`'s argument parsing.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub device: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: transport::DEFAULT_BAUD_RATE,
            timeout: transport::DEFAULT_TIMEOUT,
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Flat track points, or header-grouped segments, depending on whether the
/// device advertised a track-header schema alongside its track-point one.
/// Most handhelds in the fallback table only ever offer the flat form
/// (`A300` with no paired header); newer ones pair it with `A301`/`A302`.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackData {
    Flat(Vec<AnyRecord>),
    Grouped(Vec<RecordGroup>),
}

/// A negotiated session with a Garmin device: product identity, protocol
/// capabilities, and the channel they were negotiated over. `C` is
/// [`Framer<SerialTransport>`] for the common serial path, or
/// [`UsbTransport`] directly (behind the `usb` feature) since USB already
/// delivers whole packets.
pub struct Session<C> {
    channel: C,
    pids: PidTable,
    caps: Capabilities,
    product: ProductInfo,
}

impl Session<Framer<SerialTransport>> {
    /// Open a serial device and negotiate capabilities.
    #[instrument(skip(config), fields(device = %config.device))]
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let port = SerialTransport::open(&config.device, config.baud_rate, config.timeout)?;
        Self::negotiate(Framer::new(port))
    }
}

#[cfg(feature = "usb")]
impl Session<UsbTransport> {
    /// Open a USB device and negotiate capabilities.
    pub fn open_usb(vendor_id: u16, product_id: u16, in_endpoint: u8, out_endpoint: u8) -> Result<Self> {
        let transport = UsbTransport::open(vendor_id, product_id, in_endpoint, out_endpoint)?;
        Self::negotiate(transport)
    }
}

impl<C: PacketTransport> Session<C> {
    /// `A000` product probe, then `A001` protocol array with a fallback to
    /// the static table when the device doesn't answer it.
    fn negotiate(mut channel: C) -> Result<Self> {
        let product = capability::probe_product(&mut channel)?;
        info!(
            product_id = product.product_id,
            software_version = product.software_version,
            "identified device"
        );

        let tokens = match capability::probe_protocol_array(&mut channel) {
            Ok(tokens) => tokens,
            Err(_) => {
                info!("device didn't answer A001, falling back to static protocol table");
                capability::fallback_protocols(product.product_id, product.software_version)?
            }
        };
        let caps = capability::format_protocols(&tokens);

        let link = caps.link.clone().ok_or(SessionError::MissingLink)?;
        let pids = transfer::pid_table_for(&link).ok_or(SessionError::UnknownLink(link))?;

        Ok(Self {
            channel,
            pids,
            caps,
            product,
        })
    }

    pub fn product_info(&self) -> &ProductInfo {
        &self.product
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// The device's self-reported identifier: the first of its `A000`
    /// product description lines (there's no dedicated unit-id protocol in
    /// this family; devices fold it into the product data reply).
    pub fn get_unit_id(&self) -> Result<&str> {
        self.product
            .descriptions
            .first()
            .map(String::as_str)
            .ok_or(SessionError::MissingUnitId)
    }

    fn single_tag(&self, category: Category) -> Result<String> {
        self.caps
            .data_tags(category)
            .first()
            .cloned()
            .ok_or(SessionError::UnsupportedCategory(category))
    }

    /// `A200`/`A201`: route header tag plus the waypoint tag it reuses for
    /// points, e.g. `["D200", "D100"]`.
    fn multi_tags(&self, category: Category) -> Result<(String, Vec<String>)> {
        let tags = self.caps.data_tags(category);
        match tags {
            [hdr, points @ ..] if !points.is_empty() => Ok((hdr.clone(), points.to_vec())),
            _ => Err(SessionError::UnsupportedCategory(category)),
        }
    }

    #[instrument(skip(self, progress))]
    pub fn get_waypoints(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<AnyRecord>> {
        let tag = self.single_tag(Category::Waypoint)?;
        let pids = self.pids;
        Ok(transfer::get_single(
            &mut self.channel,
            &pids,
            Command::TransferWpt,
            pids.wpt_data,
            &tag,
            progress,
        )?)
    }

    #[instrument(skip(self, records, progress))]
    pub fn put_waypoints(
        &mut self,
        records: &[AnyRecord],
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::put_single(
            &mut self.channel,
            &pids,
            Command::TransferWpt,
            pids.wpt_data,
            records,
            progress,
        )?)
    }

    #[instrument(skip(self, progress))]
    pub fn get_routes(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<RecordGroup>> {
        let (hdr_tag, point_tags) = self.multi_tags(Category::Route)?;
        let point_tags: Vec<&str> = point_tags.iter().map(String::as_str).collect();
        let pids = self.pids;
        Ok(transfer::get_multi(
            &mut self.channel,
            &pids,
            Command::TransferRte,
            pids.rte_hdr,
            &hdr_tag,
            &point_tags,
            progress,
        )?)
    }

    /// Applies the device's route-numbering and default-name conventions
    /// (see [`transfer::prepare_route_upload`]) before sending.
    #[instrument(skip(self, groups, progress))]
    pub fn put_routes(
        &mut self,
        groups: &mut [RecordGroup],
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<()> {
        transfer::prepare_route_upload(groups);
        self.multi_tags(Category::Route)?;
        let pids = self.pids;
        Ok(transfer::put_multi(
            &mut self.channel,
            &pids,
            Command::TransferRte,
            pids.rte_hdr,
            pids.rte_wpt_data,
            groups,
            progress,
        )?)
    }

    #[instrument(skip(self, progress))]
    pub fn get_tracks(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<TrackData> {
        let tags = self.caps.data_tags(Category::Track).to_vec();
        let pids = self.pids;
        match tags.as_slice() {
            [] => Err(SessionError::UnsupportedCategory(Category::Track)),
            [tag] => Ok(TrackData::Flat(transfer::get_single(
                &mut self.channel,
                &pids,
                Command::TransferTrk,
                pids.trk_data,
                tag,
                progress,
            )?)),
            [hdr_tag, rest @ ..] => {
                let point_tags: Vec<&str> = rest.iter().map(String::as_str).collect();
                Ok(TrackData::Grouped(transfer::get_multi(
                    &mut self.channel,
                    &pids,
                    Command::TransferTrk,
                    pids.trk_hdr,
                    hdr_tag,
                    &point_tags,
                    progress,
                )?))
            }
        }
    }

    /// Flags the first point of each segment with `new_trk` (see
    /// [`transfer::prepare_track_upload`]) before sending.
    #[instrument(skip(self, tracks, progress))]
    pub fn put_tracks(&mut self, tracks: &mut TrackData, progress: Option<&mut ProgressFn<'_>>) -> Result<()> {
        let pids = self.pids;
        match tracks {
            TrackData::Flat(points) => {
                transfer::prepare_track_upload(points);
                Ok(transfer::put_single(
                    &mut self.channel,
                    &pids,
                    Command::TransferTrk,
                    pids.trk_data,
                    &*points,
                    progress,
                )?)
            }
            TrackData::Grouped(groups) => {
                for group in groups.iter_mut() {
                    transfer::prepare_track_upload(&mut group.points);
                }
                Ok(transfer::put_multi(
                    &mut self.channel,
                    &pids,
                    Command::TransferTrk,
                    pids.trk_hdr,
                    pids.trk_data,
                    &*groups,
                    progress,
                )?)
            }
        }
    }

    #[instrument(skip(self, progress))]
    pub fn get_proximities(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<AnyRecord>> {
        let tag = self.single_tag(Category::Proximity)?;
        let pids = self.pids;
        Ok(transfer::get_single(
            &mut self.channel,
            &pids,
            Command::TransferPrx,
            pids.prx_wpt_data,
            &tag,
            progress,
        )?)
    }

    #[instrument(skip(self, records, progress))]
    pub fn put_proximities(
        &mut self,
        records: &[AnyRecord],
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::put_single(
            &mut self.channel,
            &pids,
            Command::TransferPrx,
            pids.prx_wpt_data,
            records,
            progress,
        )?)
    }

    /// `A500`: almanac download. Always `D500`/`D501`, never uploaded.
    #[instrument(skip(self, progress))]
    pub fn get_almanac(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<AnyRecord>> {
        let tag = self.single_tag(Category::Almanac)?;
        let pids = self.pids;
        Ok(transfer::get_single(
            &mut self.channel,
            &pids,
            Command::TransferAlm,
            pids.almanac_data,
            &tag,
            progress,
        )?)
    }

    /// `A906`: lap download, single-record per this crate's reading of the
    /// conflicting `A906` descriptions (see `DESIGN.md`).
    #[instrument(skip(self, progress))]
    pub fn get_laps(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<AnyRecord>> {
        let tag = self.single_tag(Category::Lap)?;
        let pids = self.pids;
        Ok(transfer::get_single(
            &mut self.channel,
            &pids,
            Command::TransferLaps,
            pids.lap,
            &tag,
            progress,
        )?)
    }

    /// `A1000`: fitness run download. Each group's header is the track the
    /// run belongs to (reusing the negotiated track-header tag), its points
    /// are `D1009` riding the same ptype as track points.
    #[instrument(skip(self, progress))]
    pub fn get_runs(&mut self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<RecordGroup>> {
        let hdr_tag = self
            .caps
            .data_tags(Category::Track)
            .first()
            .cloned()
            .ok_or(SessionError::UnsupportedCategory(Category::Track))?;
        let run_tags = self.caps.data_tags(Category::Run).to_vec();
        if run_tags.is_empty() {
            return Err(SessionError::UnsupportedCategory(Category::Run));
        }
        let point_tags: Vec<&str> = run_tags.iter().map(String::as_str).collect();
        let pids = self.pids;
        Ok(transfer::get_multi(
            &mut self.channel,
            &pids,
            Command::TransferRuns,
            pids.trk_hdr,
            &hdr_tag,
            &point_tags,
            progress,
        )?)
    }

    pub fn get_time(&mut self) -> Result<D600> {
        let pids = self.pids;
        Ok(transfer::get_time(&mut self.channel, &pids)?)
    }

    pub fn get_position(&mut self) -> Result<D700> {
        let pids = self.pids;
        Ok(transfer::get_position(&mut self.channel, &pids)?)
    }

    pub fn pvt_on(&mut self) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::pvt_on(&mut self.channel, &pids)?)
    }

    pub fn pvt_off(&mut self) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::pvt_off(&mut self.channel, &pids)?)
    }

    pub fn get_pvt(&mut self) -> Result<D800> {
        let pids = self.pids;
        Ok(transfer::read_pvt(&mut self.channel, &pids)?)
    }

    pub fn abort_transfer(&mut self) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::abort_transfer(&mut self.channel, &pids)?)
    }

    pub fn turn_power_off(&mut self) -> Result<()> {
        let pids = self.pids;
        Ok(transfer::turn_power_off(&mut self.channel, &pids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{PID_PRODUCT_DATA, PID_PRODUCT_RQST, PID_PROTOCOL_ARRAY};
    use crate::framing::{PID_ACK_BYTE, MockIo};

    fn caps_with(link: &str, entries: &[(Category, &[&str])]) -> Capabilities {
        let mut caps = Capabilities {
            link: Some(link.to_string()),
            ..Capabilities::default()
        };
        for (category, tags) in entries {
            caps.categories
                .insert(*category, tags.iter().map(|s| s.to_string()).collect());
        }
        caps
    }

    fn fake_session(caps: Capabilities) -> Session<Framer<MockIo>> {
        Session {
            channel: Framer::new(MockIo::new(Vec::new())),
            pids: transfer::L001,
            caps,
            product: ProductInfo {
                product_id: 1,
                software_version: 1.0,
                descriptions: vec!["unit-123".to_string()],
            },
        }
    }

    #[test]
    fn single_tag_reports_unsupported_category() {
        let session = fake_session(caps_with("L001", &[]));
        assert!(matches!(
            session.single_tag(Category::Waypoint),
            Err(SessionError::UnsupportedCategory(Category::Waypoint))
        ));
    }

    #[test]
    fn multi_tags_splits_header_from_points() {
        let session = fake_session(caps_with("L001", &[(Category::Route, &["D200", "D100"])]));
        let (hdr, points) = session.multi_tags(Category::Route).unwrap();
        assert_eq!(hdr, "D200");
        assert_eq!(points, vec!["D100".to_string()]);
    }

    #[test]
    fn get_unit_id_reads_first_product_description() {
        let session = fake_session(caps_with("L001", &[]));
        assert_eq!(session.get_unit_id().unwrap(), "unit-123");
    }

    #[test]
    fn get_unit_id_errors_without_descriptions() {
        let mut session = fake_session(caps_with("L001", &[]));
        session.product.descriptions.clear();
        assert!(matches!(session.get_unit_id(), Err(SessionError::MissingUnitId)));
    }

    fn token(tag: u8, num: u16) -> [u8; 3] {
        let n = num.to_le_bytes();
        [tag, n[0], n[1]]
    }

    fn build_negotiate_response() -> Vec<u8> {
        let product_payload = {
            let mut buf = Vec::new();
            buf.extend_from_slice(&73u16.to_le_bytes());
            buf.extend_from_slice(&100i16.to_le_bytes());
            buf.extend_from_slice(b"unit-73\0");
            buf
        };
        let protocol_array_payload: Vec<u8> = [
            token(b'L', 1),
            token(b'A', 10),
            token(b'A', 100),
            token(b'D', 103),
            token(b'A', 200),
            token(b'D', 200),
            token(b'D', 100),
        ]
        .concat();

        let mut writer = MockIo::new(Vec::new());
        {
            let mut framer = Framer::new(&mut writer);
            framer
                .send_packet_no_ack(PID_ACK_BYTE, &(PID_PRODUCT_RQST as u16).to_le_bytes())
                .unwrap();
            framer
                .send_packet_no_ack(PID_PRODUCT_DATA, &product_payload)
                .unwrap();
            framer
                .send_packet_no_ack(PID_PROTOCOL_ARRAY, &protocol_array_payload)
                .unwrap();
        }
        writer.outbound
    }

    #[test]
    fn negotiate_resolves_link_table_and_categories() {
        let bytes = build_negotiate_response();
        let mut reader = MockIo::new(bytes);
        let framer = Framer::new(&mut reader);
        let session = Session::negotiate(framer).unwrap();

        assert_eq!(session.product_info().product_id, 73);
        assert_eq!(session.capabilities().link.as_deref(), Some("L001"));
        assert_eq!(session.pids.wpt_data, transfer::L001.wpt_data);
        assert_eq!(
            session.capabilities().data_tags(Category::Waypoint),
            &["D103".to_string()]
        );
        let (hdr, points) = session.multi_tags(Category::Route).unwrap();
        assert_eq!(hdr, "D200");
        assert_eq!(points, vec!["D100".to_string()]);
    }
}
