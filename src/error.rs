use std::path::PathBuf;

use thiserror::Error;

/// Errors raised before and during signal streaming.
///
/// Everything here is fatal: the synthesis loop itself has no recoverable
/// failure modes once streaming has begun.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open navigation file {}", path.display())]
    NavFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad RINEX version {0:.2}")]
    RinexVersion(f64),

    #[error("bad RINEX record system letter")]
    RinexSystem,

    #[error("truncated ephemeris block for PRN {0}")]
    TruncatedBlock(u8),

    #[error("malformed RINEX record: {0}")]
    RinexMalformed(String),

    #[error("invalid date and time")]
    InvalidTime,

    #[error("invalid sampling frequency")]
    InvalidSampleRate,

    #[error("GPS ephemeris file is not specified")]
    EphemerisRequired,

    #[error("no valid ephemeris available")]
    NoEphemeris,

    #[error("start time is outside the ephemeris window ({min} .. {max})")]
    AnchorOutsideWindow { min: String, max: String },

    #[error("no current set of ephemerides for the start time")]
    NoCurrentSet,

    #[error("cannot open user motion file {}", path.display())]
    MotionFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable user motion data in {}", .0.display())]
    MotionEmpty(PathBuf),

    #[error("SDR backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
