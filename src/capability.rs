//! Capability negotiation: `A000` product probe, `A001` protocol-array
//! parsing, the category Formatter, and the static fallback table for
//! devices that don't implement `A001`. Grounded on `dev_garmin.py`'s
//! `A000`, `A001`, and `ModelProtocols`.

use std::collections::BTreeMap;

use byteorder::{LittleEndian as LE, ReadBytesExt};
use thiserror::Error;

use crate::records::Category;
use crate::transport::{PacketTransport, TransportError};

pub const PID_PRODUCT_RQST: u8 = 254;
pub const PID_PRODUCT_DATA: u8 = 255;
pub const PID_PROTOCOL_ARRAY: u8 = 253;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("transport error during capability negotiation")]
    Transport(#[from] TransportError),
    #[error("malformed product data packet")]
    MalformedProductData,
    #[error("malformed protocol array entry")]
    MalformedProtocolArray,
    #[error("no fallback protocol list known for product id {product_id} version {version}")]
    NoFallback { product_id: u16, version: f64 },
}

pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Result of the `A000` product probe.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductInfo {
    pub product_id: u16,
    pub software_version: f64,
    pub descriptions: Vec<String>,
}

/// Send `Pid_Product_Rqst` and decode the device's `Pid_Product_Data` reply.
pub fn probe_product<C: PacketTransport>(channel: &mut C) -> Result<ProductInfo> {
    channel.send_packet(PID_PRODUCT_RQST, &[])?;
    let payload = channel.expect_packet(PID_PRODUCT_DATA)?;
    decode_product_data(&payload)
}

fn decode_product_data(payload: &[u8]) -> Result<ProductInfo> {
    if payload.len() < 4 {
        return Err(CapabilityError::MalformedProductData);
    }
    let mut cursor = &payload[..4];
    let product_id = cursor.read_u16::<LE>().map_err(|_| CapabilityError::MalformedProductData)?;
    let software_version =
        cursor.read_i16::<LE>().map_err(|_| CapabilityError::MalformedProductData)? as f64 / 100.0;

    let rest = &payload[4..];
    let descriptions = rest
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|&b| b as char).collect())
        .collect();

    Ok(ProductInfo {
        product_id,
        software_version,
        descriptions,
    })
}

/// Attempt to read `Pid_Protocol_Array`. Devices that implement `A000` but
/// not `A001` will not send this packet; the caller should fall back to
/// [`fallback_protocols`] after a timeout.
pub fn probe_protocol_array<C: PacketTransport>(channel: &mut C) -> Result<Vec<String>> {
    let payload = channel.expect_packet(PID_PROTOCOL_ARRAY)?;
    parse_protocol_array(&payload)
}

fn parse_protocol_array(payload: &[u8]) -> Result<Vec<String>> {
    if payload.len() % 3 != 0 {
        return Err(CapabilityError::MalformedProtocolArray);
    }
    let mut tokens = Vec::with_capacity(payload.len() / 3);
    for chunk in payload.chunks_exact(3) {
        let tag = chunk[0] as char;
        let mut num_bytes = &chunk[1..3];
        let num = num_bytes
            .read_u16::<LE>()
            .map_err(|_| CapabilityError::MalformedProtocolArray)?;
        tokens.push(format!("{tag}{num:03}"));
    }
    Ok(tokens)
}

/// The negotiated protocol set for a session: which link/command protocol
/// is in effect, and which `Dxxx` schema(s) apply to each category that
/// advertised one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capabilities {
    pub link: Option<String>,
    pub command: Option<String>,
    pub categories: BTreeMap<Category, Vec<String>>,
    pub unknown: BTreeMap<String, Vec<String>>,
}

impl Capabilities {
    pub fn data_tags(&self, category: Category) -> &[String] {
        self.categories
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn category_for_app_token(token: &str) -> Option<Category> {
    Some(match token {
        "A100" => Category::Waypoint,
        "A101" => Category::WaypointCategory,
        "A200" | "A201" => Category::Route,
        "A300" | "A301" | "A302" => Category::Track,
        "A400" => Category::Proximity,
        "A500" => Category::Almanac,
        "A600" => Category::DateTime,
        "A650" => Category::FlightBook,
        "A700" => Category::Position,
        "A800" => Category::Pvt,
        "A906" => Category::Lap,
        "A1000" => Category::Run,
        _ => return None,
    })
}

/// Walk the ordered token list from `A001` (or the fallback table) and group
/// `Dxxx` tokens under the `Axxx` category that precedes them. Idempotent:
/// feeding a formatter's own token list back in (app token followed by its
/// data tokens) reproduces the same category mapping.
pub fn format_protocols(tokens: &[String]) -> Capabilities {
    let mut caps = Capabilities::default();
    let mut current: Option<Category> = None;
    let mut current_unknown: Option<String> = None;

    for token in tokens {
        if let Some(rest) = token.strip_prefix('P') {
            let _ = rest; // physical layer, not tracked beyond acknowledging it.
            continue;
        }
        if token.starts_with('L') {
            caps.link = Some(token.clone());
            continue;
        }
        if token.starts_with('A') {
            if token == "A010" || token == "A011" {
                caps.command = Some(token.clone());
                current = None;
                current_unknown = None;
                continue;
            }
            match category_for_app_token(token) {
                Some(cat) => {
                    current = Some(cat);
                    current_unknown = None;
                    caps.categories.entry(cat).or_default();
                }
                None => {
                    current = None;
                    current_unknown = Some(token.clone());
                    caps.unknown.entry(token.clone()).or_default();
                }
            }
            continue;
        }
        if token.starts_with('D') {
            if let Some(cat) = current {
                caps.categories.entry(cat).or_default().push(token.clone());
            } else if let Some(app) = &current_unknown {
                caps.unknown.entry(app.clone()).or_default().push(token.clone());
            }
        }
    }

    caps
}

/// One entry of the static fallback table: a `[lo, hi)` software-version
/// range (inclusive low, exclusive high; `None` matches any version) and
/// the token sequence to use within that range.
struct FallbackEntry {
    version_range: Option<(f64, f64)>,
    tokens: &'static [&'static str],
}

/// Fallback `(product_id) -> [(version_range, tokens)]` table for devices
/// that don't implement `A001`, transcribed from the subset of
/// `ModelProtocols` whose `Dxxx` tags this crate implements a schema for.
/// Devices using `D101`/`D102`/`D104`/`D150`-`D155`/`D450`/`D550`/`D551`
/// fall outside this table; add a schema in `crate::records` and a row
/// here to extend it.
fn fallback_table() -> &'static [(u16, Vec<FallbackEntry>)] {
    const L001: &str = "L001";
    const A010: &str = "A010";
    const A100: &str = "A100";
    const A200: &str = "A200";
    const A201: &str = "A201";
    const A300: &str = "A300";
    const A400: &str = "A400";
    const A500: &str = "A500";
    const D100: &str = "D100";
    const D103: &str = "D103";
    const D200: &str = "D200";
    const D201: &str = "D201";
    const D300: &str = "D300";
    const D400: &str = "D400";
    const D403: &str = "D403";
    const D500: &str = "D500";
    const D501: &str = "D501";

    static TABLE: std::sync::OnceLock<Vec<(u16, Vec<FallbackEntry>)>> = std::sync::OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            (7, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A500, D500],
            }]),
            (13, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (18, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (23, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (24, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (25, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (35, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (42, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D100, A200, D200, D100, A300, D300, A400, D400, A500, D500],
            }]),
            (73, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (87, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (95, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (96, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (97, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A500, D501],
            }]),
            (100, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (105, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (106, vec![FallbackEntry {
                version_range: None,
                tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
            }]),
            (77, vec![
                FallbackEntry {
                    version_range: Some((0.00, 3.01)),
                    tokens: &[L001, A010, A100, D100, A201, D201, D100, A300, D300, A400, D400, A500, D501],
                },
                FallbackEntry {
                    version_range: Some((3.01, 3.50)),
                    tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
                },
                FallbackEntry {
                    version_range: Some((3.50, 3.61)),
                    tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A500, D501],
                },
                FallbackEntry {
                    version_range: Some((3.61, f64::MAX)),
                    tokens: &[L001, A010, A100, D103, A201, D201, D103, A300, D300, A400, D403, A500, D501],
                },
            ]),
        ]
    })
}

/// Resolve the fallback token list for a device that doesn't implement
/// `A001`, given its `A000` product id and software version.
pub fn fallback_protocols(product_id: u16, version: f64) -> Result<Vec<String>> {
    let table = fallback_table();
    let entries = table
        .iter()
        .find(|(id, _)| *id == product_id)
        .map(|(_, entries)| entries.as_slice())
        .ok_or(CapabilityError::NoFallback { product_id, version })?;

    let entry = entries
        .iter()
        .find(|e| match e.version_range {
            None => true,
            Some((lo, hi)) => version >= lo && version < hi,
        })
        .ok_or(CapabilityError::NoFallback { product_id, version })?;

    let mut tokens: Vec<String> = entry.tokens.iter().map(|s| s.to_string()).collect();
    tokens.push("A700".to_string());
    tokens.push("D700".to_string());
    tokens.push("A800".to_string());
    tokens.push("D800".to_string());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_protocols_is_idempotent() {
        let tokens: Vec<String> = ["L001", "A010", "A100", "D103"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let first = format_protocols(&tokens);
        let flattened: Vec<String> = std::iter::once("A100".to_string())
            .chain(first.categories[&Category::Waypoint].clone())
            .collect();
        let second = format_protocols(&flattened);
        assert_eq!(
            first.categories[&Category::Waypoint],
            second.categories[&Category::Waypoint]
        );
    }

    #[test]
    fn fallback_scenario_product_29_not_in_table_errors() {
        assert!(fallback_protocols(29, 4.50).is_err());
    }

    #[test]
    fn fallback_for_73_appends_position_and_pvt() {
        let tokens = fallback_protocols(73, 1.0).unwrap();
        assert!(tokens.contains(&"A700".to_string()));
        assert!(tokens.contains(&"D800".to_string()));
        let caps = format_protocols(&tokens);
        assert_eq!(caps.link.as_deref(), Some("L001"));
        assert_eq!(
            caps.data_tags(Category::Waypoint),
            &["D103".to_string()]
        );
        assert_eq!(
            caps.data_tags(Category::Proximity),
            &["D403".to_string()]
        );
    }

    #[test]
    fn fallback_77_version_ranges_are_lo_inclusive_hi_exclusive() {
        let below = fallback_protocols(77, 3.00).unwrap();
        let caps = format_protocols(&below);
        assert_eq!(caps.data_tags(Category::Waypoint), &["D100".to_string()]);

        let at_boundary = fallback_protocols(77, 3.01).unwrap();
        let caps = format_protocols(&at_boundary);
        assert_eq!(caps.data_tags(Category::Waypoint), &["D103".to_string()]);
    }

    #[test]
    fn parse_protocol_array_decodes_tag_and_number() {
        let payload = vec![b'A', 0, 100, b'D', 103, 0];
        let tokens = parse_protocol_array(&payload).unwrap();
        assert_eq!(tokens, vec!["A100".to_string(), "D103".to_string()]);
    }
}
