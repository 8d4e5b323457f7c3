//! Live position/velocity/time schema (`D800`), streamed by `A800`.
//! Grounded on `garmin.py`'s `D800` class.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};
use crate::measure::is_valid_time;

#[derive(Clone, Debug, PartialEq)]
pub struct D800 {
    pub alt: f32,
    pub epe: f32,
    pub eph: f32,
    pub epv: f32,
    pub fix: i16,
    /// Time of week, seconds since the GPS epoch.
    pub tow: f64,
    /// Latitude in radians.
    pub rlat: f64,
    /// Longitude in radians.
    pub rlon: f64,
    pub east: f32,
    pub north: f32,
    pub up: f32,
    pub msl_height: f32,
    pub leap_seconds: i16,
    pub grmn_days: i32,
}

impl D800 {
    /// Whether this fix carries a usable 2D/3D position, per `fix`'s
    /// documented values (2 = 2D, 3 = 3D, 4/5 = differential).
    pub fn has_fix(&self) -> bool {
        self.fix >= 2
    }

    /// Whether `grmn_days` carries a real value rather than the device's
    /// unknown-day sentinel.
    pub fn has_valid_day(&self) -> bool {
        is_valid_time(self.grmn_days as u32)
    }
}

impl Record for D800 {
    const TAG: &'static str = "D800";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let alt = cursor.read_f32::<LE>()?;
        let epe = cursor.read_f32::<LE>()?;
        let eph = cursor.read_f32::<LE>()?;
        let epv = cursor.read_f32::<LE>()?;
        let fix = cursor.read_i16::<LE>()?;
        let tow = cursor.read_f64::<LE>()?;
        let rlat = cursor.read_f64::<LE>()?;
        let rlon = cursor.read_f64::<LE>()?;
        let east = cursor.read_f32::<LE>()?;
        let north = cursor.read_f32::<LE>()?;
        let up = cursor.read_f32::<LE>()?;
        let msl_height = cursor.read_f32::<LE>()?;
        let leap_seconds = cursor.read_i16::<LE>()?;
        let grmn_days = cursor.read_i32::<LE>()?;
        Ok(Self {
            alt,
            epe,
            eph,
            epv,
            fix,
            tow,
            rlat,
            rlon,
            east,
            north,
            up,
            msl_height,
            leap_seconds,
            grmn_days,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_f32::<LE>(self.alt)?;
        out.write_f32::<LE>(self.epe)?;
        out.write_f32::<LE>(self.eph)?;
        out.write_f32::<LE>(self.epv)?;
        out.write_i16::<LE>(self.fix)?;
        out.write_f64::<LE>(self.tow)?;
        out.write_f64::<LE>(self.rlat)?;
        out.write_f64::<LE>(self.rlon)?;
        out.write_f32::<LE>(self.east)?;
        out.write_f32::<LE>(self.north)?;
        out.write_f32::<LE>(self.up)?;
        out.write_f32::<LE>(self.msl_height)?;
        out.write_i16::<LE>(self.leap_seconds)?;
        out.write_i32::<LE>(self.grmn_days)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> D800 {
        D800 {
            alt: 100.0,
            epe: 5.0,
            eph: 3.0,
            epv: 4.0,
            fix: 3,
            tow: 12345.0,
            rlat: 0.1,
            rlon: -0.2,
            east: 1.0,
            north: 2.0,
            up: 0.0,
            msl_height: 0.0,
            leap_seconds: 18,
            grmn_days: 100,
        }
    }

    #[test]
    fn d800_round_trip() {
        let p = sample();
        assert_eq!(D800::decode(&p.encode().unwrap()).unwrap(), p);
    }

    #[test]
    fn has_fix_checks_fix_quality() {
        let mut p = sample();
        p.fix = 1;
        assert!(!p.has_fix());
        p.fix = 3;
        assert!(p.has_fix());
    }
}
