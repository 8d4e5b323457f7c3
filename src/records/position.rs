//! Initial position fix schema (`D700`), delivered by `A700`. Grounded on
//! `garmin.py`'s `D700` class: a pair of doubles in radians, unlike every
//! other coordinate field in this protocol which uses semicircles.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct D700 {
    /// Latitude in radians.
    pub rlat: f64,
    /// Longitude in radians.
    pub rlon: f64,
}

impl Record for D700 {
    const TAG: &'static str = "D700";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let rlat = cursor.read_f64::<LE>()?;
        let rlon = cursor.read_f64::<LE>()?;
        Ok(Self { rlat, rlon })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_f64::<LE>(self.rlat)?;
        out.write_f64::<LE>(self.rlon)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d700_round_trip() {
        let p = D700 {
            rlat: 0.7853981633974483,
            rlon: -1.0471975511965976,
        };
        assert_eq!(D700::decode(&p.encode().unwrap()).unwrap(), p);
    }
}
