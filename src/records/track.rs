//! Track header (`D310`..`D312`) and track point (`D300`, `D301`) schemas.
//! Grounded on `garmin.py`'s `TrackHdr`/`TrackPoint` subclasses.

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result, read_cstr, write_cstr};

/// `D300`: bare track point -- position, device timestamp, and the
/// `new_trk` marker for the first point of a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct D300 {
    pub slat: i32,
    pub slon: i32,
    pub time: u32,
    pub new_trk: bool,
}

impl Record for D300 {
    const TAG: &'static str = "D300";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let slat = cursor.read_i32::<byteorder::LittleEndian>()?;
        let slon = cursor.read_i32::<byteorder::LittleEndian>()?;
        let time = cursor.read_u32::<byteorder::LittleEndian>()?;
        let new_trk = cursor.read_u8()? != 0;
        Ok(Self {
            slat,
            slon,
            time,
            new_trk,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<byteorder::LittleEndian>(self.slat)?;
        out.write_i32::<byteorder::LittleEndian>(self.slon)?;
        out.write_u32::<byteorder::LittleEndian>(self.time)?;
        out.write_u8(self.new_trk as u8)?;
        Ok(out)
    }
}

/// `D301`: track point with altitude and depth, both using the
/// [`crate::measure::INVALID_FLOAT`] sentinel when not measured.
#[derive(Clone, Debug, PartialEq)]
pub struct D301 {
    pub slat: i32,
    pub slon: i32,
    pub time: u32,
    pub alt: f32,
    pub depth: f32,
    pub new_trk: bool,
}

impl Record for D301 {
    const TAG: &'static str = "D301";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let slat = cursor.read_i32::<byteorder::LittleEndian>()?;
        let slon = cursor.read_i32::<byteorder::LittleEndian>()?;
        let time = cursor.read_u32::<byteorder::LittleEndian>()?;
        let alt = cursor.read_f32::<byteorder::LittleEndian>()?;
        let depth = cursor.read_f32::<byteorder::LittleEndian>()?;
        let new_trk = cursor.read_u8()? != 0;
        Ok(Self {
            slat,
            slon,
            time,
            alt,
            depth,
            new_trk,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<byteorder::LittleEndian>(self.slat)?;
        out.write_i32::<byteorder::LittleEndian>(self.slon)?;
        out.write_u32::<byteorder::LittleEndian>(self.time)?;
        out.write_f32::<byteorder::LittleEndian>(self.alt)?;
        out.write_f32::<byteorder::LittleEndian>(self.depth)?;
        out.write_u8(self.new_trk as u8)?;
        Ok(out)
    }
}

/// `D310`: track header with display flag, color, and a null-terminated
/// identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct D310 {
    pub dspl: i8,
    pub color: i8,
    pub trk_ident: String,
}

impl Record for D310 {
    const TAG: &'static str = "D310";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let dspl = cursor.read_i8()?;
        let color = cursor.read_i8()?;
        let trk_ident = read_cstr(&mut cursor)?;
        Ok(Self {
            dspl,
            color,
            trk_ident,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i8(self.dspl)?;
        out.write_i8(self.color)?;
        write_cstr(&mut out, &self.trk_ident)?;
        Ok(out)
    }
}

/// `D311`: track header carrying only a numeric index (used alongside a
/// separately-advertised `D310`-style identifier on some devices).
#[derive(Clone, Debug, PartialEq)]
pub struct D311 {
    pub index: u16,
}

impl Record for D311 {
    const TAG: &'static str = "D311";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        Ok(Self {
            index: cursor.read_u16::<byteorder::LittleEndian>()?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u16::<byteorder::LittleEndian>(self.index)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d300_round_trip() {
        let p = D300 {
            slat: 1,
            slon: -1,
            time: 1000,
            new_trk: true,
        };
        assert_eq!(D300::decode(&p.encode().unwrap()).unwrap(), p);
    }

    #[test]
    fn d301_round_trip_with_sentinel_depth() {
        let p = D301 {
            slat: 0,
            slon: 0,
            time: 0,
            alt: 123.4,
            depth: crate::measure::INVALID_FLOAT as f32,
            new_trk: false,
        };
        assert_eq!(D301::decode(&p.encode().unwrap()).unwrap(), p);
    }

    #[test]
    fn d310_round_trip() {
        let h = D310 {
            dspl: 1,
            color: 0,
            trk_ident: "TRACK 1".into(),
        };
        assert_eq!(D310::decode(&h.encode().unwrap()).unwrap(), h);
    }
}
