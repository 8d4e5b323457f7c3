//! Fitness run schema (`D1009`), transferred by `A1000` as the body of a
//! multi-record transfer whose header is the track this run belongs to.
//! Grounded on `garmin.py`'s `D1009` class.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct D1009 {
    pub track_index: u16,
    pub first_lap_index: u16,
    pub last_lap_index: u16,
    pub sport_type: u8,
    pub program_type: u8,
    pub multisport: u8,
    pub quick_workout_time: u32,
    pub quick_workout_distance: f32,
}

impl Record for D1009 {
    const TAG: &'static str = "D1009";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let track_index = cursor.read_u16::<LE>()?;
        let first_lap_index = cursor.read_u16::<LE>()?;
        let last_lap_index = cursor.read_u16::<LE>()?;
        let sport_type = cursor.read_u8()?;
        let program_type = cursor.read_u8()?;
        let multisport = cursor.read_u8()?;
        let _unused1 = cursor.read_u8()?;
        let _unused2 = cursor.read_u16::<LE>()?;
        let quick_workout_time = cursor.read_u32::<LE>()?;
        let quick_workout_distance = cursor.read_f32::<LE>()?;
        Ok(Self {
            track_index,
            first_lap_index,
            last_lap_index,
            sport_type,
            program_type,
            multisport,
            quick_workout_time,
            quick_workout_distance,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u16::<LE>(self.track_index)?;
        out.write_u16::<LE>(self.first_lap_index)?;
        out.write_u16::<LE>(self.last_lap_index)?;
        out.write_u8(self.sport_type)?;
        out.write_u8(self.program_type)?;
        out.write_u8(self.multisport)?;
        out.write_u8(0)?;
        out.write_u16::<LE>(0)?;
        out.write_u32::<LE>(self.quick_workout_time)?;
        out.write_f32::<LE>(self.quick_workout_distance)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d1009_round_trip() {
        let r = D1009 {
            track_index: 0,
            first_lap_index: 0,
            last_lap_index: 3,
            sport_type: 1,
            program_type: 0,
            multisport: 0,
            quick_workout_time: 360_000,
            quick_workout_distance: 10_000.0,
        };
        assert_eq!(D1009::decode(&r.encode().unwrap()).unwrap(), r);
    }
}
