//! Flight log schema (`D650`), transferred by `A650`. Grounded on
//! `garmin.py`'s `D650` class.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result, read_cstr, write_cstr};

#[derive(Clone, Debug, PartialEq)]
pub struct D650 {
    pub takeoff_time: u32,
    pub landing_time: u32,
    pub takeoff_slat: i32,
    pub takeoff_slon: i32,
    pub landing_slat: i32,
    pub landing_slon: i32,
    pub night_time: u32,
    pub num_landings: u32,
    pub max_speed: f32,
    pub max_alt: f32,
    pub distance: f32,
    pub cross_country_flag: u8,
    pub departure_name: String,
    pub departure_ident: String,
    pub arrival_name: String,
    pub arrival_ident: String,
    pub ac_id: String,
}

impl Record for D650 {
    const TAG: &'static str = "D650";

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = buf;
        let takeoff_time = cursor.read_u32::<LE>()?;
        let landing_time = cursor.read_u32::<LE>()?;
        let takeoff_slat = cursor.read_i32::<LE>()?;
        let takeoff_slon = cursor.read_i32::<LE>()?;
        let landing_slat = cursor.read_i32::<LE>()?;
        let landing_slon = cursor.read_i32::<LE>()?;
        let night_time = cursor.read_u32::<LE>()?;
        let num_landings = cursor.read_u32::<LE>()?;
        let max_speed = cursor.read_f32::<LE>()?;
        let max_alt = cursor.read_f32::<LE>()?;
        let distance = cursor.read_f32::<LE>()?;
        let cross_country_flag = cursor.read_u8()?;
        let departure_name = read_cstr(&mut cursor)?;
        let departure_ident = read_cstr(&mut cursor)?;
        let arrival_name = read_cstr(&mut cursor)?;
        let arrival_ident = read_cstr(&mut cursor)?;
        let ac_id = read_cstr(&mut cursor)?;
        Ok(Self {
            takeoff_time,
            landing_time,
            takeoff_slat,
            takeoff_slon,
            landing_slat,
            landing_slon,
            night_time,
            num_landings,
            max_speed,
            max_alt,
            distance,
            cross_country_flag,
            departure_name,
            departure_ident,
            arrival_name,
            arrival_ident,
            ac_id,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u32::<LE>(self.takeoff_time)?;
        out.write_u32::<LE>(self.landing_time)?;
        out.write_i32::<LE>(self.takeoff_slat)?;
        out.write_i32::<LE>(self.takeoff_slon)?;
        out.write_i32::<LE>(self.landing_slat)?;
        out.write_i32::<LE>(self.landing_slon)?;
        out.write_u32::<LE>(self.night_time)?;
        out.write_u32::<LE>(self.num_landings)?;
        out.write_f32::<LE>(self.max_speed)?;
        out.write_f32::<LE>(self.max_alt)?;
        out.write_f32::<LE>(self.distance)?;
        out.write_u8(self.cross_country_flag)?;
        write_cstr(&mut out, &self.departure_name)?;
        write_cstr(&mut out, &self.departure_ident)?;
        write_cstr(&mut out, &self.arrival_name)?;
        write_cstr(&mut out, &self.arrival_ident)?;
        write_cstr(&mut out, &self.ac_id)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d650_round_trip() {
        let f = D650 {
            takeoff_time: 1000,
            landing_time: 4600,
            takeoff_slat: 1,
            takeoff_slon: 2,
            landing_slat: 3,
            landing_slon: 4,
            night_time: 0,
            num_landings: 1,
            max_speed: 120.0,
            max_alt: 3500.0,
            distance: 250_000.0,
            cross_country_flag: 1,
            departure_name: "HOME FIELD".into(),
            departure_ident: "KXYZ".into(),
            arrival_name: "DEST FIELD".into(),
            arrival_ident: "KABC".into(),
            ac_id: "N12345".into(),
        };
        assert_eq!(D650::decode(&f.encode().unwrap()).unwrap(), f);
    }
}
