//! Real-time GPS L1 C/A baseband signal synthesis.
//!
//! Feed it a broadcast ephemeris file, a receiver position and a start
//! time; it streams the composite 16-bit I/Q baseband a receiver at that
//! place and time would observe, ready for upconversion to 1575.42 MHz.

pub mod ca;
pub mod channel;
pub mod config;
pub mod constants;
pub mod dac;
pub mod ephemeris;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod geodesy;
pub mod modulator;
pub mod motion;
pub mod navmsg;
pub mod propagation;
pub mod rinex;
pub mod sim;
pub mod sink;
pub mod test_utilities;
pub mod time;

pub use crate::error::Error;
