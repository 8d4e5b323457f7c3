//! Route header (`D200`..`D202`) and route link (`D210`) schemas. A route
//! point reuses a waypoint schema and is not redefined here. Grounded on
//! `garmin.py`'s `RouteHdr`/`RouteLink` subclasses.

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result, read_cstr, read_fixed_str, write_cstr, write_fixed_str};

/// `D200`: route header carrying only a route number.
#[derive(Clone, Debug, PartialEq)]
pub struct D200 {
    pub route_num: i8,
}

impl Record for D200 {
    const TAG: &'static str = "D200";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        Ok(Self {
            route_num: cursor.read_i8()?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i8(self.route_num)?;
        Ok(out)
    }
}

/// `D201`: route header with a route number and a 20-byte comment.
#[derive(Clone, Debug, PartialEq)]
pub struct D201 {
    pub route_num: i8,
    pub cmnt: String,
}

impl Record for D201 {
    const TAG: &'static str = "D201";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let route_num = cursor.read_i8()?;
        let cmnt = read_fixed_str(&mut cursor, 20)?;
        Ok(Self { route_num, cmnt })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i8(self.route_num)?;
        write_fixed_str(&mut out, &self.cmnt, 20)?;
        Ok(out)
    }
}

/// `D202`: route header with a free-form, null-terminated identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct D202 {
    pub ident: String,
}

impl Record for D202 {
    const TAG: &'static str = "D202";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        Ok(Self {
            ident: read_cstr(&mut cursor)?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_cstr(&mut out, &self.ident)?;
        Ok(out)
    }
}

/// `D210`: an inter-waypoint route link, present when the negotiated route
/// protocol is `A201`.
#[derive(Clone, Debug, PartialEq)]
pub struct D210 {
    pub class: i16,
    pub subclass: [u8; 18],
    pub ident: String,
}

impl Record for D210 {
    const TAG: &'static str = "D210";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let class = cursor.read_i16::<byteorder::LittleEndian>()?;
        let mut subclass = [0u8; 18];
        std::io::Read::read_exact(&mut cursor, &mut subclass)?;
        let ident = read_cstr(&mut cursor)?;
        Ok(Self {
            class,
            subclass,
            ident,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i16::<byteorder::LittleEndian>(self.class)?;
        out.extend_from_slice(&self.subclass);
        write_cstr(&mut out, &self.ident)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d200_round_trip() {
        let h = D200 { route_num: 3 };
        assert_eq!(D200::decode(&h.encode().unwrap()).unwrap(), h);
    }

    #[test]
    fn d202_round_trip() {
        let h = D202 {
            ident: "R1".into(),
        };
        assert_eq!(D202::decode(&h.encode().unwrap()).unwrap(), h);
    }

    #[test]
    fn d210_round_trip() {
        let link = D210 {
            class: 0,
            subclass: [0xff; 18],
            ident: "LINK".into(),
        };
        assert_eq!(D210::decode(&link.encode().unwrap()).unwrap(), link);
    }
}
