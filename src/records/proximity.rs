//! Proximity waypoint schemas (`D400`, `D403`): a waypoint plus a
//! proximity-trigger distance in meters. Grounded on `garmin.py`'s
//! `ProxPoint` mixin, which extends `D100`/`D103` with a trailing `dst`
//! float.

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::codec::{Record, Result};
use crate::records::waypoint::{D100, D103};

#[derive(Clone, Debug, PartialEq)]
pub struct D400 {
    pub waypoint: D100,
    pub dst: f32,
}

impl Record for D400 {
    const TAG: &'static str = "D400";

    fn decode(buf: &[u8]) -> Result<Self> {
        let split = buf.len() - 4;
        let waypoint = D100::decode(&buf[..split])?;
        let mut tail = &buf[split..];
        let dst = tail.read_f32::<byteorder::LittleEndian>()?;
        Ok(Self { waypoint, dst })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = self.waypoint.encode()?;
        out.write_f32::<byteorder::LittleEndian>(self.dst)?;
        Ok(out)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct D403 {
    pub waypoint: D103,
    pub dst: f32,
}

impl Record for D403 {
    const TAG: &'static str = "D403";

    fn decode(buf: &[u8]) -> Result<Self> {
        let split = buf.len() - 4;
        let waypoint = D103::decode(&buf[..split])?;
        let mut tail = &buf[split..];
        let dst = tail.read_f32::<byteorder::LittleEndian>()?;
        Ok(Self { waypoint, dst })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = self.waypoint.encode()?;
        out.write_f32::<byteorder::LittleEndian>(self.dst)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::waypoint::WaypointCore;

    #[test]
    fn d403_round_trip() {
        let p = D403 {
            waypoint: D103 {
                core: WaypointCore {
                    ident: "PX1".into(),
                    slat: 10,
                    slon: 20,
                    cmnt: "".into(),
                },
                smbl: 1,
                dspl: 0,
            },
            dst: 150.0,
        };
        assert_eq!(D403::decode(&p.encode().unwrap()).unwrap(), p);
    }
}
