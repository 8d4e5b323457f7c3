//! Maps a negotiated `Dxxx` tag to its concrete schema and application
//! category. Grounded on `garmin.py`'s module-level class registry: rather
//! than generate code per tag, the device's protocol array selects one of a
//! small, fixed set of schemas per category at session-open time.

use thiserror::Error;

use crate::codec::{CodecError, Record};
use crate::records::almanac::{D500, D501};
use crate::records::flightbook::D650;
use crate::records::lap::{D906, D1011, D1015};
use crate::records::position::D700;
use crate::records::proximity::{D400, D403};
use crate::records::pvt::D800;
use crate::records::route::{D200, D201, D202, D210};
use crate::records::run::D1009;
use crate::records::time::{D600, D601};
use crate::records::track::{D300, D301, D310, D311};
use crate::records::waypoint::{D100, D103, D108, D120};
use crate::records::Category;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown or unsupported record tag {0:?}")]
    UnknownTag(String),
    #[error("record codec error")]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// An owned record value of any schema this crate implements, tagged with
/// the concrete `Dxxx` it was decoded as.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyRecord {
    D100(D100),
    D103(D103),
    D108(D108),
    D120(D120),
    D200(D200),
    D201(D201),
    D202(D202),
    D210(D210),
    D300(D300),
    D301(D301),
    D310(D310),
    D311(D311),
    D400(D400),
    D403(D403),
    D500(D500),
    D501(D501),
    D600(D600),
    D601(D601),
    D650(D650),
    D700(D700),
    D800(D800),
    D906(D906),
    D1009(D1009),
    D1011(D1011),
    D1015(D1015),
}

macro_rules! any_record_dispatch {
    ($($variant:ident),* $(,)?) => {
        impl AnyRecord {
            /// The `Dxxx` tag this value was decoded as, e.g. `"D103"`.
            pub fn tag(&self) -> &'static str {
                match self {
                    $(AnyRecord::$variant(_) => $variant::TAG,)*
                }
            }

            /// Re-encode this value back to its wire representation.
            pub fn encode(&self) -> Result<Vec<u8>> {
                match self {
                    $(AnyRecord::$variant(r) => Ok(r.encode()?),)*
                }
            }
        }
    };
}

any_record_dispatch!(
    D100, D103, D108, D120, D200, D201, D202, D210, D300, D301, D310, D311, D400, D403, D500,
    D501, D600, D601, D650, D700, D800, D906, D1009, D1011, D1015,
);

/// Decode `buf` as the schema named by `tag`, e.g. `decode("D103", buf)`.
pub fn decode(tag: &str, buf: &[u8]) -> Result<AnyRecord> {
    Ok(match tag {
        "D100" => AnyRecord::D100(D100::decode(buf)?),
        "D103" => AnyRecord::D103(D103::decode(buf)?),
        "D108" => AnyRecord::D108(D108::decode(buf)?),
        "D120" => AnyRecord::D120(D120::decode(buf)?),
        "D200" => AnyRecord::D200(D200::decode(buf)?),
        "D201" => AnyRecord::D201(D201::decode(buf)?),
        "D202" => AnyRecord::D202(D202::decode(buf)?),
        "D210" => AnyRecord::D210(D210::decode(buf)?),
        "D300" => AnyRecord::D300(D300::decode(buf)?),
        "D301" => AnyRecord::D301(D301::decode(buf)?),
        "D310" => AnyRecord::D310(D310::decode(buf)?),
        "D311" => AnyRecord::D311(D311::decode(buf)?),
        "D400" => AnyRecord::D400(D400::decode(buf)?),
        "D403" => AnyRecord::D403(D403::decode(buf)?),
        "D500" => AnyRecord::D500(D500::decode(buf)?),
        "D501" => AnyRecord::D501(D501::decode(buf)?),
        "D600" => AnyRecord::D600(D600::decode(buf)?),
        "D601" => AnyRecord::D601(D601::decode(buf)?),
        "D650" => AnyRecord::D650(D650::decode(buf)?),
        "D700" => AnyRecord::D700(D700::decode(buf)?),
        "D800" => AnyRecord::D800(D800::decode(buf)?),
        "D906" => AnyRecord::D906(D906::decode(buf)?),
        "D1009" => AnyRecord::D1009(D1009::decode(buf)?),
        "D1011" => AnyRecord::D1011(D1011::decode(buf)?),
        "D1015" => AnyRecord::D1015(D1015::decode(buf)?),
        other => return Err(RegistryError::UnknownTag(other.to_string())),
    })
}

/// The application category a `Dxxx` tag belongs to.
pub fn category(tag: &str) -> Option<Category> {
    Some(match tag {
        "D100" | "D101" | "D102" | "D103" | "D104" | "D105" | "D106" | "D107" | "D108"
        | "D109" | "D110" | "D150" | "D151" | "D152" | "D154" | "D155" => Category::Waypoint,
        "D120" => Category::WaypointCategory,
        "D200" | "D201" | "D202" => Category::Route,
        "D210" => Category::RouteLink,
        "D300" | "D301" | "D302" | "D304" => Category::Track,
        "D310" | "D311" | "D312" => Category::TrackHeader,
        "D400" | "D403" | "D450" => Category::Proximity,
        "D500" | "D501" | "D550" | "D551" => Category::Almanac,
        "D600" | "D601" => Category::DateTime,
        "D650" => Category::FlightBook,
        "D700" => Category::Position,
        "D800" => Category::Pvt,
        "D906" | "D1011" | "D1015" => Category::Lap,
        "D1009" => Category::Run,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_round_trips_via_tag() {
        let original = D200 { route_num: 1 };
        let encoded = original.encode().unwrap();
        let decoded = decode("D200", &encoded).unwrap();
        assert_eq!(decoded.tag(), "D200");
        assert_eq!(decoded.encode().unwrap(), encoded);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(decode("D999", &[]).is_err());
    }

    #[test]
    fn category_lookup() {
        assert_eq!(category("D103"), Some(Category::Waypoint));
        assert_eq!(category("D210"), Some(Category::RouteLink));
        assert_eq!(category("D999"), None);
    }
}
