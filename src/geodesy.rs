//! WGS-84 coordinate conversions and small vector helpers.

use crate::constants::{WGS84_ECCENTRICITY, WGS84_RADIUS};

/// Earth-centered, Earth-fixed Cartesian position [m].
pub type Ecef = [f64; 3];

/// Geodetic position: latitude [rad], longitude [rad], height [m].
pub type Llh = [f64; 3];

/// Azimuth and elevation of a line of sight [rad].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AzEl {
    pub az: f64,
    pub el: f64,
}

pub fn sub_vect(x1: &[f64; 3], x2: &[f64; 3]) -> [f64; 3] {
    [x1[0] - x2[0], x1[1] - x2[1], x1[2] - x2[2]]
}

pub fn norm_vect(x: &[f64; 3]) -> f64 {
    (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt()
}

pub fn dot_prod(x1: &[f64; 3], x2: &[f64; 3]) -> f64 {
    x1[0] * x2[0] + x1[1] * x2[1] + x1[2] * x2[2]
}

/// Convert an ECEF position to geodetic latitude/longitude/height.
///
/// Iterative solution; converges to better than a millimetre. A degenerate
/// input (norm below 1 mm) yields lat = lon = 0 and h = -a.
pub fn ecef_to_geodetic(xyz: &Ecef) -> Llh {
    let a = WGS84_RADIUS;
    let e = WGS84_ECCENTRICITY;
    let e2 = e * e;
    let eps = 1.0e-3;

    if norm_vect(xyz) < eps {
        return [0.0, 0.0, -a];
    }

    let (x, y, z) = (xyz[0], xyz[1], xyz[2]);
    let rho2 = x * x + y * y;
    let mut dz = e2 * z;

    let (zdz, nh, n) = loop {
        let zdz = z + dz;
        let nh = (rho2 + zdz * zdz).sqrt();
        let slat = zdz / nh;
        let n = a / (1.0 - e2 * slat * slat).sqrt();
        let dz_new = n * e2 * slat;

        if (dz - dz_new).abs() < eps {
            break (zdz, nh, n);
        }
        dz = dz_new;
    };

    [zdz.atan2(rho2.sqrt()), y.atan2(x), nh - n]
}

/// Convert a geodetic position to ECEF.
pub fn geodetic_to_ecef(llh: &Llh) -> Ecef {
    let a = WGS84_RADIUS;
    let e = WGS84_ECCENTRICITY;
    let e2 = e * e;

    let clat = llh[0].cos();
    let slat = llh[0].sin();
    let clon = llh[1].cos();
    let slon = llh[1].sin();
    let d = e * slat;

    let n = a / (1.0 - d * d).sqrt();
    let nph = n + llh[2];

    let tmp = nph * clat;
    [
        tmp * clon,
        tmp * slon,
        ((1.0 - e2) * n + llh[2]) * slat,
    ]
}

/// The 3x3 basis of the local tangent (north/east/up) frame at `llh`.
pub fn local_tangent_matrix(llh: &Llh) -> [[f64; 3]; 3] {
    let slat = llh[0].sin();
    let clat = llh[0].cos();
    let slon = llh[1].sin();
    let clon = llh[1].cos();

    [
        [-slat * clon, -slat * slon, clat],
        [-slon, clon, 0.0],
        [clat * clon, clat * slon, slat],
    ]
}

/// Rotate an ECEF difference vector into the local north/east/up frame.
pub fn ecef_to_enu(xyz: &[f64; 3], t: &[[f64; 3]; 3]) -> [f64; 3] {
    [
        t[0][0] * xyz[0] + t[0][1] * xyz[1] + t[0][2] * xyz[2],
        t[1][0] * xyz[0] + t[1][1] * xyz[1] + t[1][2] * xyz[2],
        t[2][0] * xyz[0] + t[2][1] * xyz[1] + t[2][2] * xyz[2],
    ]
}

/// Azimuth (clockwise from north, [0, 2pi)) and elevation of a local
/// north/east/up vector.
pub fn enu_to_azel(neu: &[f64; 3]) -> AzEl {
    let mut az = neu[1].atan2(neu[0]);
    if az < 0.0 {
        az += 2.0 * std::f64::consts::PI;
    }

    let ne = (neu[0] * neu[0] + neu[1] * neu[1]).sqrt();
    AzEl {
        az,
        el: neu[2].atan2(ne),
    }
}
