//! Pseudorange observation model: light time, Earth rotation, satellite
//! clock, ionospheric delay and look angles.

use std::f64::consts::PI;

use crate::constants::{OMEGA_EARTH, R2D, SECONDS_IN_DAY, SPEED_OF_LIGHT};
use crate::ephemeris::{Ephemeris, IonoUtc};
use crate::geodesy::{
    dot_prod, ecef_to_enu, ecef_to_geodetic, enu_to_azel, local_tangent_matrix, norm_vect,
    sub_vect, AzEl, Ecef, Llh,
};
use crate::time::GpsTime;

/// One pseudorange observation of one satellite.
#[derive(Clone, Copy, Debug, Default)]
pub struct Range {
    /// Receive time of the observation.
    pub g: GpsTime,
    /// Pseudorange [m]: geometric distance minus c times clock bias,
    /// plus ionospheric delay.
    pub range: f64,
    /// Pseudorange rate [m/s].
    pub rate: f64,
    /// Geometric distance [m].
    pub d: f64,
    pub azel: AzEl,
    /// Ionospheric delay [m].
    pub iono_delay: f64,
}

/// Klobuchar ionospheric delay [m] for a signal received at `llh` from
/// direction `azel` at GPS time `g`.
///
/// Disabled -> 0. Without valid broadcast coefficients the model falls
/// back to the 5 ns nominal zenith delay scaled by obliquity.
pub fn ionospheric_delay(ionoutc: &IonoUtc, g: GpsTime, llh: &Llh, azel: AzEl) -> f64 {
    if !ionoutc.enable {
        return 0.0;
    }

    // Elevation and user position in semicircles.
    let e = azel.el / PI;
    let phi_u = llh[0] / PI;
    let lam_u = llh[1] / PI;

    // Obliquity factor.
    let f = 1.0 + 16.0 * (0.53 - e).powi(3);

    if !ionoutc.valid {
        return f * 5.0e-9 * SPEED_OF_LIGHT;
    }

    // Earth's central angle between the user and the ionospheric
    // intersection point (semicircles).
    let psi = 0.0137 / (e + 0.11) - 0.022;

    let phi_i = (phi_u + psi * azel.az.cos()).clamp(-0.416, 0.416);
    let lam_i = lam_u + psi * azel.az.sin() / (phi_i * PI).cos();

    // Geomagnetic latitude, mean ionospheric height 350 km.
    let phi_m = phi_i + 0.064 * ((lam_i - 1.617) * PI).cos();
    let phi_m2 = phi_m * phi_m;
    let phi_m3 = phi_m2 * phi_m;

    let amp = (ionoutc.alpha0 + ionoutc.alpha1 * phi_m + ionoutc.alpha2 * phi_m2 + ionoutc.alpha3 * phi_m3)
        .max(0.0);
    let per = (ionoutc.beta0 + ionoutc.beta1 * phi_m + ionoutc.beta2 * phi_m2 + ionoutc.beta3 * phi_m3)
        .max(72_000.0);

    // Local time of day at the intersection point.
    let mut t = SECONDS_IN_DAY / 2.0 * lam_i + g.sec;
    while t >= SECONDS_IN_DAY {
        t -= SECONDS_IN_DAY;
    }
    while t < 0.0 {
        t += SECONDS_IN_DAY;
    }

    let x = 2.0 * PI * (t - 50_400.0) / per;

    if x.abs() < 1.57 {
        let x2 = x * x;
        let x4 = x2 * x2;
        f * (5.0e-9 + amp * (1.0 - x2 / 2.0 + x4 / 24.0)) * SPEED_OF_LIGHT
    } else {
        f * 5.0e-9 * SPEED_OF_LIGHT
    }
}

/// Compute the pseudorange observation of `eph` at receive time `g` for a
/// receiver at `xyz`.
pub fn compute_range(eph: &Ephemeris, ionoutc: &IonoUtc, g: GpsTime, xyz: &Ecef) -> Range {
    // SV state at the time of the observation.
    let (mut pos, vel, clk) = eph.satpos(g);

    // Receiver-to-satellite vector and light time.
    let mut los = sub_vect(&pos, xyz);
    let tau = norm_vect(&los) / SPEED_OF_LIGHT;

    // Extrapolate the satellite position back to the transmission time.
    for k in 0..3 {
        pos[k] -= vel[k] * tau;
    }

    // Earth rotation during the transit; the velocity change is
    // negligible.
    let xrot = pos[0] + pos[1] * OMEGA_EARTH * tau;
    let yrot = pos[1] - pos[0] * OMEGA_EARTH * tau;
    pos[0] = xrot;
    pos[1] = yrot;

    // New line of sight and geometric distance.
    los = sub_vect(&pos, xyz);
    let d = norm_vect(&los);

    let mut rho = Range {
        g,
        d,
        range: d - SPEED_OF_LIGHT * clk.bias,
        rate: dot_prod(&vel, &los) / d,
        ..Default::default()
    };

    // Look angles from the receiver's local tangent frame.
    let llh = ecef_to_geodetic(xyz);
    let tmat = local_tangent_matrix(&llh);
    let neu = ecef_to_enu(&los, &tmat);
    rho.azel = enu_to_azel(&neu);

    rho.iono_delay = ionospheric_delay(ionoutc, g, &llh, rho.azel);
    rho.range += rho.iono_delay;

    rho
}

/// Look angles of a valid satellite above the elevation mask, or `None`
/// when the record is invalid or the satellite is below the mask.
pub fn check_sat_visibility(
    eph: &Ephemeris,
    g: GpsTime,
    xyz: &Ecef,
    elv_mask_deg: f64,
) -> Option<AzEl> {
    if !eph.valid {
        return None;
    }

    let llh = ecef_to_geodetic(xyz);
    let tmat = local_tangent_matrix(&llh);

    let (pos, _, _) = eph.satpos(g);
    let los = sub_vect(&pos, xyz);
    let neu = ecef_to_enu(&los, &tmat);
    let azel = enu_to_azel(&neu);

    (azel.el * R2D > elv_mask_deg).then_some(azel)
}
