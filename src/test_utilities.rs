//! Synthetic orbits and constellations shared by unit and integration tests.

use crate::constants::MAX_SAT;
use crate::ephemeris::Ephemeris;
use crate::time::{DateTime, GpsTime};

/// A healthy, near-circular GPS orbit anchored at 2014-12-20 00:00:00.
///
/// `omg0` and `m0` place the satellite in its plane; everything else is a
/// nominal mid-constellation value.
pub fn nominal_ephemeris(omg0: f64, m0: f64) -> Ephemeris {
    let t = DateTime {
        y: 2014,
        m: 12,
        d: 20,
        hh: 0,
        mm: 0,
        sec: 0.0,
    };
    let toc = GpsTime::from_date(&t);

    let mut eph = Ephemeris {
        valid: true,
        t,
        toc,
        toe: toc,
        iodc: 100,
        iode: 100,
        deltan: 4.0e-9,
        ecc: 0.001,
        sqrta: 5153.7,
        m0,
        omg0,
        inc0: 0.96,
        aop: 0.0,
        omgdot: -8.0e-9,
        idot: 0.0,
        af0: 0.0,
        af1: 0.0,
        af2: 0.0,
        tgd: 0.0,
        svhlth: 0,
        code_l2: 1,
        ..Default::default()
    };
    eph.update_derived();
    eph
}

/// A full synthetic constellation: `count` satellites spread over six
/// planes, remaining slots invalid.
pub fn synthetic_constellation(count: usize) -> [Ephemeris; MAX_SAT] {
    let mut set = [Ephemeris::default(); MAX_SAT];
    let planes = 6;
    for (sv, slot) in set.iter_mut().enumerate().take(count) {
        let plane = sv % planes;
        let in_plane = sv / planes;
        let omg0 = 2.0 * std::f64::consts::PI * (plane as f64) / (planes as f64);
        let m0 = 2.0 * std::f64::consts::PI * (in_plane as f64) / 6.0
            + 0.3 * (plane as f64);
        *slot = nominal_ephemeris(omg0, m0);
    }
    set
}
