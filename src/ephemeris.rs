//! Broadcast ephemeris records and Keplerian satellite propagation.

use crate::constants::{
    GM_EARTH, OMEGA_EARTH, SECONDS_IN_HALF_WEEK, SECONDS_IN_WEEK,
};
use crate::geodesy::Ecef;
use crate::time::{DateTime, GpsTime};

/// One satellite's broadcast ephemeris, as decoded from a RINEX navigation
/// record. `valid` gates every consumer; an invalid record is all-zero.
///
/// The last four fields are derived once after decoding and cached.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ephemeris {
    pub valid: bool,
    /// Calendar copy of the time of clock.
    pub t: DateTime,
    /// Time of clock.
    pub toc: GpsTime,
    /// Time of ephemeris.
    pub toe: GpsTime,
    /// Issue of data, clock.
    pub iodc: i32,
    /// Issue of data, ephemeris.
    pub iode: i32,
    /// Mean motion correction [rad/s].
    pub deltan: f64,
    pub cuc: f64,
    pub cus: f64,
    pub cic: f64,
    pub cis: f64,
    pub crc: f64,
    pub crs: f64,
    /// Eccentricity.
    pub ecc: f64,
    /// Square root of the semi-major axis [sqrt(m)].
    pub sqrta: f64,
    /// Mean anomaly at reference time [rad].
    pub m0: f64,
    /// Longitude of ascending node [rad].
    pub omg0: f64,
    /// Inclination at reference time [rad].
    pub inc0: f64,
    /// Argument of perigee [rad].
    pub aop: f64,
    /// Rate of right ascension [rad/s].
    pub omgdot: f64,
    /// Rate of inclination [rad/s].
    pub idot: f64,
    pub af0: f64,
    pub af1: f64,
    pub af2: f64,
    /// Group delay [s].
    pub tgd: f64,
    pub svhlth: i32,
    pub code_l2: i32,

    /// Corrected mean motion [rad/s].
    pub n: f64,
    /// sqrt(1 - e^2).
    pub sq1e2: f64,
    /// Semi-major axis [m].
    pub a: f64,
    /// omgdot - OMEGA_EARTH.
    pub omgkdot: f64,
}

/// Ionospheric (Klobuchar) and UTC parameters from the navigation header.
#[derive(Clone, Copy, Debug, Default)]
pub struct IonoUtc {
    /// User switch: when false the ionospheric delay is forced to zero.
    pub enable: bool,
    /// True only when all four header groups were present.
    pub valid: bool,
    pub alpha0: f64,
    pub alpha1: f64,
    pub alpha2: f64,
    pub alpha3: f64,
    pub beta0: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub beta3: f64,
    pub a0: f64,
    pub a1: f64,
    pub dtls: i32,
    pub tot: i32,
    pub wnt: i32,
    pub dtlsf: i32,
    pub dn: i32,
    pub wnlsf: i32,
}

/// Satellite clock bias [s] and drift [s/s].
#[derive(Clone, Copy, Debug, Default)]
pub struct SatClock {
    pub bias: f64,
    pub rate: f64,
}

fn wrap_half_week(mut tk: f64) -> f64 {
    if tk > SECONDS_IN_HALF_WEEK {
        tk -= SECONDS_IN_WEEK;
    } else if tk < -SECONDS_IN_HALF_WEEK {
        tk += SECONDS_IN_WEEK;
    }
    tk
}

impl Ephemeris {
    /// Fill the cached derivatives after the scalar fields are populated.
    pub fn update_derived(&mut self) {
        self.a = self.sqrta * self.sqrta;
        self.n = (GM_EARTH / (self.a * self.a * self.a)).sqrt() + self.deltan;
        self.sq1e2 = (1.0 - self.ecc * self.ecc).sqrt();
        self.omgkdot = self.omgdot - OMEGA_EARTH;
    }

    /// Satellite ECEF position, velocity and clock state at GPS time `g`.
    ///
    /// Keplerian propagation per IS-GPS-200 with the relativistic clock
    /// term; velocity from the analytic derivatives of the orbital
    /// elements.
    pub fn satpos(&self, g: GpsTime) -> (Ecef, Ecef, SatClock) {
        let tk = wrap_half_week(g.sec - self.toe.sec);

        let mk = self.m0 + self.n * tk;

        // Eccentric anomaly by Newton iteration on Kepler's equation.
        let mut ek = mk;
        let mut ekold = ek + 1.0;
        let mut one_minus_ecos_e = 0.0;
        while (ek - ekold).abs() > 1.0e-14 {
            ekold = ek;
            one_minus_ecos_e = 1.0 - self.ecc * ekold.cos();
            ek += (mk - ekold + self.ecc * ekold.sin()) / one_minus_ecos_e;
        }

        let sek = ek.sin();
        let cek = ek.cos();
        let ekdot = self.n / one_minus_ecos_e;

        let relativistic = -4.442807633e-10 * self.ecc * self.sqrta * sek;

        // Argument of latitude and its harmonic corrections.
        let pk = (self.sq1e2 * sek).atan2(cek - self.ecc) + self.aop;
        let pkdot = self.sq1e2 * ekdot / one_minus_ecos_e;

        let s2pk = (2.0 * pk).sin();
        let c2pk = (2.0 * pk).cos();

        let uk = pk + self.cus * s2pk + self.cuc * c2pk;
        let suk = uk.sin();
        let cuk = uk.cos();
        let ukdot = pkdot * (1.0 + 2.0 * (self.cus * c2pk - self.cuc * s2pk));

        let rk = self.a * one_minus_ecos_e + self.crc * c2pk + self.crs * s2pk;
        let rkdot = self.a * self.ecc * sek * ekdot + 2.0 * pkdot * (self.crs * c2pk - self.crc * s2pk);

        let ik = self.inc0 + self.idot * tk + self.cic * c2pk + self.cis * s2pk;
        let sik = ik.sin();
        let cik = ik.cos();
        let ikdot = self.idot + 2.0 * pkdot * (self.cis * c2pk - self.cic * s2pk);

        let xpk = rk * cuk;
        let ypk = rk * suk;
        let xpkdot = rkdot * cuk - ypk * ukdot;
        let ypkdot = rkdot * suk + xpk * ukdot;

        let ok = self.omg0 + tk * self.omgkdot - OMEGA_EARTH * self.toe.sec;
        let sok = ok.sin();
        let cok = ok.cos();

        let pos = [
            xpk * cok - ypk * cik * sok,
            xpk * sok + ypk * cik * cok,
            ypk * sik,
        ];

        let tmp = ypkdot * cik - ypk * sik * ikdot;
        let vel = [
            -self.omgkdot * pos[1] + xpkdot * cok - tmp * sok,
            self.omgkdot * pos[0] + xpkdot * sok + tmp * cok,
            ypk * cik * ikdot + ypkdot * sik,
        ];

        // Clock correction uses its own epoch.
        let tk = wrap_half_week(g.sec - self.toc.sec);
        let clk = SatClock {
            bias: self.af0 + tk * (self.af1 + tk * self.af2) + relativistic - self.tgd,
            rate: self.af1 + 2.0 * tk * self.af2,
        };

        (pos, vel, clk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::nominal_ephemeris;

    #[test]
    fn satpos_radius_is_orbital() {
        let eph = nominal_ephemeris(0.0, 0.0);
        let (pos, _, _) = eph.satpos(eph.toe);
        let r = crate::geodesy::norm_vect(&pos);
        // Semi-major axis 26560 km, near-circular orbit.
        assert!((r - eph.a).abs() < 30_000.0, "r = {r}");
    }

    #[test]
    fn satpos_velocity_matches_finite_difference() {
        let eph = nominal_ephemeris(1.0, 2.0);
        let g0 = eph.toe;
        let g1 = g0.advanced_by(0.5);
        let (p0, v0, _) = eph.satpos(g0);
        let (p1, _, _) = eph.satpos(g1);
        for k in 0..3 {
            let fd = (p1[k] - p0[k]) / 0.5;
            assert!((fd - v0[k]).abs() < 1.0, "axis {k}: fd {fd} vs v {}", v0[k]);
        }
    }

    #[test]
    fn clock_bias_includes_polynomial() {
        let mut eph = nominal_ephemeris(0.0, 0.0);
        eph.af0 = 1e-5;
        eph.af1 = 1e-11;
        eph.tgd = 2e-9;
        let g = eph.toc.advanced_by(100.0);
        let (_, _, clk) = eph.satpos(g);
        let expect = 1e-5 + 100.0 * 1e-11 - 2e-9;
        // Relativistic term is bounded by 4.4e-10 * e * sqrt(a).
        assert!((clk.bias - expect).abs() < 1e-7);
        assert!((clk.rate - 1e-11).abs() < 1e-15);
    }
}
