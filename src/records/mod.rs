//! `Dxxx` record schemas, grouped by application category. Each submodule
//! implements [`crate::codec::Record`] for its concrete types; record
//! variant *selection* at runtime is [`crate::registry`]'s job.

pub mod almanac;
pub mod flightbook;
pub mod lap;
pub mod position;
pub mod proximity;
pub mod pvt;
pub mod route;
pub mod run;
pub mod time;
pub mod track;
pub mod waypoint;

/// The application category a negotiated `Dxxx` schema belongs to, mirroring
/// the categories the capability Formatter (`A000`/`A001`) opens (see
/// [`crate::capability`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Waypoint,
    WaypointCategory,
    Route,
    RouteLink,
    Track,
    TrackHeader,
    Proximity,
    Almanac,
    DateTime,
    FlightBook,
    Position,
    Pvt,
    Lap,
    Run,
}
