//! Fitness lap schemas (`D906`, `D1011`, `D1015`). Grounded on `garmin.py`'s
//! `D906`/`D1011`/`D1015` classes. `A906` transfers `D906` as a single
//! record per lap; `A1000` (see [`crate::records::run`]) transfers
//! `D1011`/`D1015` laps as the body of a multi-record run transfer.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};

/// `D906`: the original single-record lap format.
#[derive(Clone, Debug, PartialEq)]
pub struct D906 {
    pub start_time: i32,
    pub total_time: i32,
    pub total_distance: f32,
    pub begin_slat: i32,
    pub begin_slon: i32,
    pub end_slat: i32,
    pub end_slon: i32,
    pub calories: i32,
    pub track_index: i8,
}

impl Record for D906 {
    const TAG: &'static str = "D906";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let start_time = cursor.read_i32::<LE>()?;
        let total_time = cursor.read_i32::<LE>()?;
        let total_distance = cursor.read_f32::<LE>()?;
        let begin_slat = cursor.read_i32::<LE>()?;
        let begin_slon = cursor.read_i32::<LE>()?;
        let end_slat = cursor.read_i32::<LE>()?;
        let end_slon = cursor.read_i32::<LE>()?;
        let calories = cursor.read_i32::<LE>()?;
        let track_index = cursor.read_i8()?;
        let _unused = cursor.read_i8()?;
        Ok(Self {
            start_time,
            total_time,
            total_distance,
            begin_slat,
            begin_slon,
            end_slat,
            end_slon,
            calories,
            track_index,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LE>(self.start_time)?;
        out.write_i32::<LE>(self.total_time)?;
        out.write_f32::<LE>(self.total_distance)?;
        out.write_i32::<LE>(self.begin_slat)?;
        out.write_i32::<LE>(self.begin_slon)?;
        out.write_i32::<LE>(self.end_slat)?;
        out.write_i32::<LE>(self.end_slon)?;
        out.write_i32::<LE>(self.calories)?;
        out.write_i8(self.track_index)?;
        out.write_i8(0)?;
        Ok(out)
    }
}

/// `D1011`: the richer lap format used by Forerunner/Edge devices, with
/// heart rate, cadence, and trigger-method fields.
#[derive(Clone, Debug, PartialEq)]
pub struct D1011 {
    pub index: u16,
    pub start_time: u32,
    pub total_time: u32,
    pub total_dist: f32,
    pub max_speed: f32,
    pub begin_lat: i32,
    pub begin_lon: i32,
    pub end_lat: i32,
    pub end_lon: i32,
    pub calories: u16,
    pub avg_heart_rate: u8,
    pub max_heart_rate: u8,
    pub intensity: u8,
    pub avg_cadence: u8,
    pub trigger_method: u8,
}

impl Record for D1011 {
    const TAG: &'static str = "D1011";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let index = cursor.read_u16::<LE>()?;
        let _unused = cursor.read_u16::<LE>()?;
        let start_time = cursor.read_u32::<LE>()?;
        let total_time = cursor.read_u32::<LE>()?;
        let total_dist = cursor.read_f32::<LE>()?;
        let max_speed = cursor.read_f32::<LE>()?;
        let begin_lat = cursor.read_i32::<LE>()?;
        let begin_lon = cursor.read_i32::<LE>()?;
        let end_lat = cursor.read_i32::<LE>()?;
        let end_lon = cursor.read_i32::<LE>()?;
        let calories = cursor.read_u16::<LE>()?;
        let avg_heart_rate = cursor.read_u8()?;
        let max_heart_rate = cursor.read_u8()?;
        let intensity = cursor.read_u8()?;
        let avg_cadence = cursor.read_u8()?;
        let trigger_method = cursor.read_u8()?;
        Ok(Self {
            index,
            start_time,
            total_time,
            total_dist,
            max_speed,
            begin_lat,
            begin_lon,
            end_lat,
            end_lon,
            calories,
            avg_heart_rate,
            max_heart_rate,
            intensity,
            avg_cadence,
            trigger_method,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u16::<LE>(self.index)?;
        out.write_u16::<LE>(0)?;
        out.write_u32::<LE>(self.start_time)?;
        out.write_u32::<LE>(self.total_time)?;
        out.write_f32::<LE>(self.total_dist)?;
        out.write_f32::<LE>(self.max_speed)?;
        out.write_i32::<LE>(self.begin_lat)?;
        out.write_i32::<LE>(self.begin_lon)?;
        out.write_i32::<LE>(self.end_lat)?;
        out.write_i32::<LE>(self.end_lon)?;
        out.write_u16::<LE>(self.calories)?;
        out.write_u8(self.avg_heart_rate)?;
        out.write_u8(self.max_heart_rate)?;
        out.write_u8(self.intensity)?;
        out.write_u8(self.avg_cadence)?;
        out.write_u8(self.trigger_method)?;
        Ok(out)
    }
}

/// `D1015`: wire-identical to `D1011` on the Forerunner 305, which reports
/// it under a different tag.
#[derive(Clone, Debug, PartialEq)]
pub struct D1015(pub D1011);

impl Record for D1015 {
    const TAG: &'static str = "D1015";

    fn decode(buf: &[u8]) -> Result<Self> {
        Ok(Self(D1011::decode(buf)?))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.0.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d906_round_trip() {
        let l = D906 {
            start_time: 100,
            total_time: 12345,
            total_distance: 1000.0,
            begin_slat: 1,
            begin_slon: 2,
            end_slat: 3,
            end_slon: 4,
            calories: 250,
            track_index: 0,
        };
        assert_eq!(D906::decode(&l.encode().unwrap()).unwrap(), l);
    }

    #[test]
    fn d1011_round_trip() {
        let l = D1011 {
            index: 1,
            start_time: 0,
            total_time: 60_000,
            total_dist: 5000.0,
            max_speed: 5.2,
            begin_lat: 1,
            begin_lon: 2,
            end_lat: 3,
            end_lon: 4,
            calories: 400,
            avg_heart_rate: 140,
            max_heart_rate: 170,
            intensity: 0,
            avg_cadence: 85,
            trigger_method: 0,
        };
        assert_eq!(D1011::decode(&l.encode().unwrap()).unwrap(), l);
    }
}
