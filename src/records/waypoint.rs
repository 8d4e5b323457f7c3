//! Waypoint record schemas (`D100`..`D155`) and the waypoint-category
//! schema `D120`. Grounded on `garmin.py`'s `Waypoint` base class and its
//! `D10x` subclasses: a 6-byte ident, semicircle lat/lon, an unused
//! reserved field, and a 40-byte comment, with progressively richer
//! optional fields in the later variants.

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::codec::{CodecError, ReadLe, Record, Result, WriteLe, read_fixed_str, write_fixed_str};

/// Fields common to every waypoint variant.
#[derive(Clone, Debug, PartialEq)]
pub struct WaypointCore {
    pub ident: String,
    pub slat: i32,
    pub slon: i32,
    pub cmnt: String,
}

impl WaypointCore {
    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let ident = read_fixed_str(buf, 6)?;
        let slat = buf.read_i32_le()?;
        let slon = buf.read_i32_le()?;
        let _unused = buf.read_u32_le()?;
        let cmnt = read_fixed_str(buf, 40)?;
        Ok(Self {
            ident,
            slat,
            slon,
            cmnt,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        write_fixed_str(out, &self.ident, 6)?;
        out.write_i32_le(self.slat)?;
        out.write_i32_le(self.slon)?;
        out.write_u32_le(0)?;
        write_fixed_str(out, &self.cmnt, 40)?;
        Ok(())
    }
}

/// `D100`: the plain waypoint, no extra fields.
#[derive(Clone, Debug, PartialEq)]
pub struct D100 {
    pub core: WaypointCore,
}

impl Record for D100 {
    const TAG: &'static str = "D100";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        Ok(Self {
            core: WaypointCore::decode(&mut cursor)?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.core.encode(&mut out)?;
        Ok(out)
    }
}

/// `D103`: waypoint plus a symbol id and display style byte, the variant
/// most commonly advertised by handheld eTrex/GPSMAP devices.
#[derive(Clone, Debug, PartialEq)]
pub struct D103 {
    pub core: WaypointCore,
    pub smbl: i8,
    pub dspl: i8,
}

impl Record for D103 {
    const TAG: &'static str = "D103";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let core = WaypointCore::decode(&mut cursor)?;
        let smbl = cursor.read_i8().map_err(CodecError::Io)?;
        let dspl = cursor.read_i8().map_err(CodecError::Io)?;
        Ok(Self { core, smbl, dspl })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.core.encode(&mut out)?;
        out.push(self.smbl as u8);
        out.push(self.dspl as u8);
        Ok(out)
    }
}

/// `D108`: the full-featured waypoint used by later color-screen devices,
/// carrying class, color, attributes, a 2D symbol, an 18-byte subclass
/// blob, altitude/depth/distance floats, and free-form facility fields.
#[derive(Clone, Debug, PartialEq)]
pub struct D108 {
    pub wpt_class: i8,
    pub color: i8,
    pub dspl: i8,
    pub attr: i8,
    pub smbl: i16,
    pub subclass: [u8; 18],
    pub slat: i32,
    pub slon: i32,
    pub alt: f32,
    pub dpth: f32,
    pub dist: f32,
    pub state: String,
    pub cc: String,
    pub ident: String,
    pub cmnt: String,
    pub facility: String,
    pub city: String,
    pub addr: String,
    pub cross_road: String,
}

impl Record for D108 {
    const TAG: &'static str = "D108";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let wpt_class = cursor.read_i8()?;
        let color = cursor.read_i8()?;
        let dspl = cursor.read_i8()?;
        let attr = cursor.read_i8()?;
        let smbl = cursor.read_i16_le()?;
        let mut subclass = [0u8; 18];
        std::io::Read::read_exact(&mut cursor, &mut subclass)?;
        let slat = cursor.read_i32_le()?;
        let slon = cursor.read_i32_le()?;
        let alt = cursor.read_f32_le()?;
        let dpth = cursor.read_f32_le()?;
        let dist = cursor.read_f32_le()?;
        let state = read_fixed_str(&mut cursor, 2)?;
        let cc = read_fixed_str(&mut cursor, 2)?;
        let ident = crate::codec::read_cstr(&mut cursor)?;
        let cmnt = crate::codec::read_cstr(&mut cursor)?;
        let facility = crate::codec::read_cstr(&mut cursor)?;
        let city = crate::codec::read_cstr(&mut cursor)?;
        let addr = crate::codec::read_cstr(&mut cursor)?;
        let cross_road = crate::codec::read_cstr(&mut cursor)?;
        Ok(Self {
            wpt_class,
            color,
            dspl,
            attr,
            smbl,
            subclass,
            slat,
            slon,
            alt,
            dpth,
            dist,
            state,
            cc,
            ident,
            cmnt,
            facility,
            city,
            addr,
            cross_road,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i8(self.wpt_class)?;
        out.write_i8(self.color)?;
        out.write_i8(self.dspl)?;
        out.write_i8(self.attr)?;
        out.write_i16_le(self.smbl)?;
        out.extend_from_slice(&self.subclass);
        out.write_i32_le(self.slat)?;
        out.write_i32_le(self.slon)?;
        out.write_f32_le(self.alt)?;
        out.write_f32_le(self.dpth)?;
        out.write_f32_le(self.dist)?;
        write_fixed_str(&mut out, &self.state, 2)?;
        write_fixed_str(&mut out, &self.cc, 2)?;
        crate::codec::write_cstr(&mut out, &self.ident)?;
        crate::codec::write_cstr(&mut out, &self.cmnt)?;
        crate::codec::write_cstr(&mut out, &self.facility)?;
        crate::codec::write_cstr(&mut out, &self.city)?;
        crate::codec::write_cstr(&mut out, &self.addr)?;
        crate::codec::write_cstr(&mut out, &self.cross_road)?;
        Ok(out)
    }
}

/// `D120`: a waypoint category (`A101`), a 16-bit bitmask plus a 17-byte
/// name.
#[derive(Clone, Debug, PartialEq)]
pub struct D120 {
    pub name: String,
}

impl Record for D120 {
    const TAG: &'static str = "D120";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let name = read_fixed_str(&mut cursor, 17)?;
        Ok(Self { name })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_fixed_str(&mut out, &self.name, 17)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d100_round_trip() {
        let w = D100 {
            core: WaypointCore {
                ident: "WPT1".into(),
                slat: 100_000,
                slon: -200_000,
                cmnt: "A COMMENT".into(),
            },
        };
        let encoded = w.encode().unwrap();
        assert_eq!(encoded.len(), 6 + 4 + 4 + 4 + 40);
        assert_eq!(D100::decode(&encoded).unwrap(), w);
    }

    #[test]
    fn d103_round_trip() {
        let w = D103 {
            core: WaypointCore {
                ident: "A".into(),
                slat: 1,
                slon: 2,
                cmnt: "".into(),
            },
            smbl: 18,
            dspl: 1,
        };
        let encoded = w.encode().unwrap();
        assert_eq!(D103::decode(&encoded).unwrap(), w);
    }

    #[test]
    fn d120_rejects_overlong_name() {
        let w = D120 {
            name: "THIS NAME IS WAY TOO LONG".into(),
        };
        assert!(w.encode().is_err());
    }
}
