//! Receiver trajectory input: CSV user-motion files and NMEA GGA streams.
//!
//! Both readers yield a bounded sequence of ECEF positions at the 10 Hz
//! trajectory cadence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::constants::USER_MOTION_SIZE;
use crate::error::Error;
use crate::geodesy::{geodetic_to_ecef, Ecef};

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path).map_err(|source| Error::MotionFileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Read a `t,x,y,z` user-motion CSV sampled at 10 Hz. At most
/// [`USER_MOTION_SIZE`] rows are kept; malformed rows end the read.
pub fn read_user_motion(path: &Path) -> Result<Vec<Ecef>, Error> {
    let reader = open(path)?;
    let mut xyz = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if xyz.len() >= USER_MOTION_SIZE {
            break;
        }

        let mut cols = line.split(',').map(str::trim);
        let parsed = (|| {
            let _t: f64 = cols.next()?.parse().ok()?;
            let x: f64 = cols.next()?.parse().ok()?;
            let y: f64 = cols.next()?.parse().ok()?;
            let z: f64 = cols.next()?.parse().ok()?;
            Some([x, y, z])
        })();

        match parsed {
            Some(p) => xyz.push(p),
            None => break,
        }
    }

    if xyz.is_empty() {
        return Err(Error::MotionEmpty(path.to_path_buf()));
    }
    Ok(xyz)
}

/// Degrees-minutes NMEA coordinate (ddmm.mmmm) to decimal degrees.
fn dm_to_deg(dm: f64) -> f64 {
    let deg = (dm / 100.0).floor();
    deg + (dm - deg * 100.0) / 60.0
}

fn gga_checksum_ok(line: &str) -> bool {
    let Some(star) = line.rfind('*') else {
        // Checksum field is optional on some loggers.
        return true;
    };
    let body = &line[1..star];
    let Ok(expect) = u8::from_str_radix(line[star + 1..].trim(), 16) else {
        return false;
    };
    let sum = body.bytes().fold(0u8, |a, b| a ^ b);
    sum == expect
}

/// Read `$GPGGA`/`$GNGGA` fixes into ECEF positions, assumed to arrive at
/// the 10 Hz trajectory cadence. Sentences with a failed checksum or no
/// fix are skipped.
pub fn read_nmea_gga(path: &Path) -> Result<Vec<Ecef>, Error> {
    let reader = open(path)?;
    let mut xyz = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if xyz.len() >= USER_MOTION_SIZE {
            break;
        }
        if !(line.starts_with("$GPGGA") || line.starts_with("$GNGGA")) {
            continue;
        }
        if !gga_checksum_ok(line) {
            warn!("GGA sentence failed checksum, skipped");
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 10 {
            continue;
        }

        // Fix quality 0 means no position.
        if fields[6].trim() == "0" {
            continue;
        }

        let parsed = (|| {
            let lat_dm: f64 = fields[2].parse().ok()?;
            let lat_sign = match fields[3] {
                "N" => 1.0,
                "S" => -1.0,
                _ => return None,
            };
            let lon_dm: f64 = fields[4].parse().ok()?;
            let lon_sign = match fields[5] {
                "E" => 1.0,
                "W" => -1.0,
                _ => return None,
            };
            let alt: f64 = fields[9].parse().ok()?;

            let llh = [
                lat_sign * dm_to_deg(lat_dm) / crate::constants::R2D,
                lon_sign * dm_to_deg(lon_dm) / crate::constants::R2D,
                alt,
            ];
            Some(geodetic_to_ecef(&llh))
        })();

        if let Some(p) = parsed {
            xyz.push(p);
        }
    }

    if xyz.is_empty() {
        return Err(Error::MotionEmpty(path.to_path_buf()));
    }
    Ok(xyz)
}
