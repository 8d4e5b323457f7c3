//! Date/time schemas (`D600`, `D601`), delivered by the one-shot `A600`
//! transfer. Grounded on `garmin.py`'s `TimePoint` class: broken-down UTC
//! fields, month/day/year/hour/min/sec.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct D600 {
    pub month: i8,
    pub day: i8,
    pub year: u16,
    pub hour: i16,
    pub min: i8,
    pub sec: i8,
}

impl Record for D600 {
    const TAG: &'static str = "D600";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let month = cursor.read_i8()?;
        let day = cursor.read_i8()?;
        let year = cursor.read_u16::<LE>()?;
        let hour = cursor.read_i16::<LE>()?;
        let min = cursor.read_i8()?;
        let sec = cursor.read_i8()?;
        Ok(Self {
            month,
            day,
            year,
            hour,
            min,
            sec,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i8(self.month)?;
        out.write_i8(self.day)?;
        out.write_u16::<LE>(self.year)?;
        out.write_i16::<LE>(self.hour)?;
        out.write_i8(self.min)?;
        out.write_i8(self.sec)?;
        Ok(out)
    }
}

/// `D601`: identical wire layout to `D600` on the devices that advertise
/// it; kept as a distinct type so the registry can record which tag a
/// given device actually negotiated.
#[derive(Clone, Debug, PartialEq)]
pub struct D601(pub D600);

impl Record for D601 {
    const TAG: &'static str = "D601";

    fn decode(buf: &[u8]) -> Result<Self> {
        Ok(Self(D600::decode(buf)?))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.0.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d600_round_trip() {
        let t = D600 {
            month: 7,
            day: 26,
            year: 2026,
            hour: 14,
            min: 30,
            sec: 0,
        };
        assert_eq!(D600::decode(&t.encode().unwrap()).unwrap(), t);
    }
}
