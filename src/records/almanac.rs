//! GPS almanac schemas (`D500`, `D501`). Grounded on `garmin.py`'s
//! `Almanac` subclasses: orbital elements for one satellite per record.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};

macro_rules! decode_almanac_fields {
    ($cursor:expr) => {{
        (
            $cursor.read_i32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
            $cursor.read_f32::<LE>()?,
        )
    }};
}

macro_rules! encode_almanac_fields {
    ($out:expr, $self:expr) => {{
        $out.write_i32::<LE>($self.weeknum)?;
        $out.write_f32::<LE>($self.toa)?;
        $out.write_f32::<LE>($self.af0)?;
        $out.write_f32::<LE>($self.af1)?;
        $out.write_f32::<LE>($self.e)?;
        $out.write_f32::<LE>($self.sqrta)?;
        $out.write_f32::<LE>($self.m0)?;
        $out.write_f32::<LE>($self.w)?;
        $out.write_f32::<LE>($self.omg0)?;
        $out.write_f32::<LE>($self.odot)?;
        $out.write_f32::<LE>($self.i)?;
    }};
}

#[derive(Clone, Debug, PartialEq)]
pub struct D500 {
    pub weeknum: i32,
    pub toa: f32,
    pub af0: f32,
    pub af1: f32,
    pub e: f32,
    pub sqrta: f32,
    pub m0: f32,
    pub w: f32,
    pub omg0: f32,
    pub odot: f32,
    pub i: f32,
}

impl Record for D500 {
    const TAG: &'static str = "D500";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let (weeknum, toa, af0, af1, e, sqrta, m0, w, omg0, odot, i) =
            decode_almanac_fields!(cursor);
        Ok(Self {
            weeknum,
            toa,
            af0,
            af1,
            e,
            sqrta,
            m0,
            w,
            omg0,
            odot,
            i,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode_almanac_fields!(out, self);
        Ok(out)
    }
}

/// `D501`: as `D500`, plus a health byte.
#[derive(Clone, Debug, PartialEq)]
pub struct D501 {
    pub weeknum: i32,
    pub toa: f32,
    pub af0: f32,
    pub af1: f32,
    pub e: f32,
    pub sqrta: f32,
    pub m0: f32,
    pub w: f32,
    pub omg0: f32,
    pub odot: f32,
    pub i: f32,
    pub health: i8,
}

impl Record for D501 {
    const TAG: &'static str = "D501";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let (weeknum, toa, af0, af1, e, sqrta, m0, w, omg0, odot, i) =
            decode_almanac_fields!(cursor);
        let health = cursor.read_i8()?;
        Ok(Self {
            weeknum,
            toa,
            af0,
            af1,
            e,
            sqrta,
            m0,
            w,
            omg0,
            odot,
            i,
            health,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode_almanac_fields!(out, self);
        out.write_i8(self.health)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d501_round_trip() {
        let a = D501 {
            weeknum: 2300,
            toa: 1.0,
            af0: 2.0,
            af1: 3.0,
            e: 4.0,
            sqrta: 5.0,
            m0: 6.0,
            w: 7.0,
            omg0: 8.0,
            odot: 9.0,
            i: 10.0,
            health: 0,
        };
        assert_eq!(D501::decode(&a.encode().unwrap()).unwrap(), a);
    }
}
