//! Physical and signal constants shared across the crate.
//!
//! Conventional values from the GPS interface specification (IS-GPS-200)
//! and the WGS-84 datum.

/// Speed of light [m/s].
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8;

/// WGS-84 value of the Earth's gravitational constant [m^3/s^2].
pub const GM_EARTH: f64 = 3.986005e14;

/// WGS-84 value of the Earth's rotation rate [rad/s].
pub const OMEGA_EARTH: f64 = 7.2921151467e-5;

/// WGS-84 semi-major axis [m].
pub const WGS84_RADIUS: f64 = 6_378_137.0;

/// WGS-84 first eccentricity.
pub const WGS84_ECCENTRICITY: f64 = 0.0818191908426;

/// L1 carrier wavelength [m].
pub const LAMBDA_L1: f64 = 0.190293672798365;

/// GPS L1 carrier frequency [Hz].
pub const CARR_FREQ: f64 = 1.57542e9;

/// C/A code chipping rate [chips/s].
pub const CODE_FREQ: f64 = 1.023e6;

/// Ratio of code rate to carrier frequency (1/1540).
pub const CARR_TO_CODE: f64 = 1.0 / 1540.0;

/// C/A code sequence length in chips.
pub const CA_SEQ_LEN: usize = 1023;

/// Number of satellites carried in a broadcast ephemeris file.
pub const MAX_SAT: usize = 32;

/// Number of simulated channels.
pub const MAX_CHAN: usize = 12;

/// Subframes per navigation frame.
pub const N_SBF: usize = 5;

/// Words per subframe.
pub const N_DWRD_SBF: usize = 10;

/// Length of the per-channel word ring: one spare subframe ahead of the
/// five freshly generated ones, so a code-phase rollover can still read
/// the tail of the previous batch.
pub const N_DWRD: usize = (N_SBF + 1) * N_DWRD_SBF;

/// Maximum number of two-hourly ephemeris sets in a daily broadcast file.
pub const EPHEM_ARRAY_SIZE: usize = 13;

/// Maximum number of user-motion records (10 Hz, 300 s).
pub const USER_MOTION_SIZE: usize = 3000;

/// Complex samples per synthesis iteration (100 ms at 2.6 Ms/s).
pub const NUM_SAMPLES: usize = 260_000;

pub const SECONDS_IN_WEEK: f64 = 604_800.0;
pub const SECONDS_IN_HALF_WEEK: f64 = 302_400.0;
pub const SECONDS_IN_DAY: f64 = 86_400.0;
pub const SECONDS_IN_HOUR: f64 = 3_600.0;
pub const SECONDS_IN_MINUTE: f64 = 60.0;

/// Degrees per radian.
pub const R2D: f64 = 57.2957795131;
