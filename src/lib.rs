//! A library for speaking the Garmin device-interface protocol over serial
//! or USB: negotiating the protocol variant a device supports, then
//! transferring waypoints, routes, tracks, proximity waypoints, almanacs,
//! laps, runs, and live position/velocity/time in either direction.
//!
//! See [`Session`] for the main entry point into the library: open one with
//! [`Session::open`] (serial) or [`Session::open_usb`] (USB, behind the
//! `usb` feature), then call its per-category `get_*`/`put_*` methods.
//!
//! # Feature flags
//!
//! - `cli` enables the additional dependencies needed by the `gpslink`
//!   binary
//! - `usb` enables [`transport::UsbTransport`] and [`Session::open_usb`]

pub mod capability;
pub mod codec;
pub mod framing;
pub mod measure;
pub mod records;
pub mod registry;
pub mod session;
pub mod transfer;
pub mod transport;

use thiserror::Error;

pub use capability::{CapabilityError, Capabilities, ProductInfo};
pub use registry::AnyRecord;
pub use session::{ProgressFn, Session, SessionConfig, SessionError, TrackData};
pub use transfer::{Command, PidTable, RecordGroup, TransferError};
pub use transport::{TransportError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};

#[cfg(feature = "usb")]
pub use transport::UsbTransport;

/// Aggregates every layer's error for callers who don't need to match on a
/// specific one; [`SessionError`] already covers all of them and is what
/// [`Session`]'s methods return directly, so this exists mainly for callers
/// who construct a lower layer (e.g. [`framing::Framer`]) on its own.
#[derive(Error, Debug)]
pub enum GpsLinkError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("link framing error")]
    Link(#[from] framing::LinkError),
    #[error("record codec error")]
    Codec(#[from] codec::CodecError),
    #[error("record registry error")]
    Registry(#[from] registry::RegistryError),
    #[error("capability negotiation error")]
    Capability(#[from] CapabilityError),
    #[error("transfer error")]
    Transfer(#[from] TransferError),
    #[error("session error")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, GpsLinkError>;
