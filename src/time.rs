//! GPS time and calendar time value types.
//!
//! GPS time counts whole weeks since the 1980-01-06 epoch plus seconds
//! into the week. All arithmetic returns new values and keeps the
//! seconds-of-week normalized to [0, 604800).

use std::fmt;

use crate::constants::{SECONDS_IN_DAY, SECONDS_IN_HOUR, SECONDS_IN_MINUTE, SECONDS_IN_WEEK};

/// A point in GPS time: week number since 1980-01-06 and seconds of week.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GpsTime {
    pub week: i32,
    pub sec: f64,
}

/// Gregorian calendar date and time (UTC, no leap-second bookkeeping).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DateTime {
    pub y: i32,
    pub m: i32,
    pub d: i32,
    pub hh: i32,
    pub mm: i32,
    pub sec: f64,
}

impl GpsTime {
    /// Difference `self - other` in seconds, spanning week boundaries.
    pub fn diff(self, other: GpsTime) -> f64 {
        (self.sec - other.sec) + f64::from(self.week - other.week) * SECONDS_IN_WEEK
    }

    /// A new time `dt` seconds later, normalized into the week. The result
    /// is rounded to the millisecond so repeated 0.1 s steps stay exact.
    pub fn advanced_by(self, dt: f64) -> GpsTime {
        let mut week = self.week;
        let mut sec = (self.sec + dt) * 1000.0;
        sec = sec.round() / 1000.0;

        while sec >= SECONDS_IN_WEEK {
            sec -= SECONDS_IN_WEEK;
            week += 1;
        }
        while sec < 0.0 {
            sec += SECONDS_IN_WEEK;
            week -= 1;
        }

        GpsTime { week, sec }
    }

    /// Convert a calendar date into GPS time.
    pub fn from_date(t: &DateTime) -> GpsTime {
        const DOY: [i32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

        let ye = t.y - 1980;

        // Leap days since Jan 5/Jan 6, 1980.
        let mut lpdays = ye / 4 + 1;
        if ye % 4 == 0 && t.m <= 2 {
            lpdays -= 1;
        }

        // Days elapsed since Jan 5/Jan 6, 1980.
        let de = ye * 365 + DOY[(t.m - 1) as usize] + t.d + lpdays - 6;

        GpsTime {
            week: de / 7,
            sec: f64::from(de % 7) * SECONDS_IN_DAY
                + f64::from(t.hh) * SECONDS_IN_HOUR
                + f64::from(t.mm) * SECONDS_IN_MINUTE
                + t.sec,
        }
    }

    /// Convert back to a calendar date, via the Julian day number.
    pub fn to_date(self) -> DateTime {
        let c = (7 * self.week + (self.sec / SECONDS_IN_DAY).floor() as i32 + 2_444_245) + 1537;
        let d = ((f64::from(c) - 122.1) / 365.25) as i32;
        let e = 365 * d + d / 4;
        let f = ((c - e) as f64 / 30.6001) as i32;

        let day = c - e - (30.6001 * f64::from(f)) as i32;
        let month = f - 1 - 12 * (f / 14);
        let year = d - 4715 - (7 + month) / 10;

        DateTime {
            y: year,
            m: month,
            d: day,
            hh: ((self.sec / 3600.0) as i32) % 24,
            mm: ((self.sec / 60.0) as i32) % 60,
            sec: self.sec - 60.0 * (self.sec / 60.0).floor(),
        }
    }
}

impl DateTime {
    /// The current UTC wall-clock time, whole seconds.
    pub fn now_utc() -> DateTime {
        use chrono::{Datelike, Timelike, Utc};

        let now = Utc::now();
        DateTime {
            y: now.year(),
            m: now.month() as i32,
            d: now.day() as i32,
            hh: now.hour() as i32,
            mm: now.minute() as i32,
            sec: f64::from(now.second()),
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02},{:02}:{:02}:{:02.0}",
            self.y, self.m, self.d, self.hh, self.mm, self.sec
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_epoch_is_week_zero() {
        let t = DateTime {
            y: 1980,
            m: 1,
            d: 6,
            hh: 0,
            mm: 0,
            sec: 0.0,
        };
        let g = GpsTime::from_date(&t);
        assert_eq!(g.week, 0);
        assert!(g.sec.abs() < 1e-9);
    }

    #[test]
    fn known_date_roundtrip() {
        let t = DateTime {
            y: 2014,
            m: 12,
            d: 20,
            hh: 0,
            mm: 0,
            sec: 0.0,
        };
        let g = GpsTime::from_date(&t);
        let back = g.to_date();
        assert_eq!((back.y, back.m, back.d, back.hh, back.mm), (2014, 12, 20, 0, 0));
        assert!((back.sec - t.sec).abs() < 1e-3);
    }

    #[test]
    fn advance_normalizes_week_rollover() {
        let g = GpsTime {
            week: 1824,
            sec: SECONDS_IN_WEEK - 0.05,
        };
        let g1 = g.advanced_by(0.1);
        assert_eq!(g1.week, 1825);
        assert!((g1.sec - 0.05).abs() < 1e-9);

        let g2 = g1.advanced_by(-0.1);
        assert_eq!(g2.week, 1824);
    }

    #[test]
    fn advance_accumulates_without_drift() {
        let mut g = GpsTime { week: 2000, sec: 0.0 };
        for _ in 0..6000 {
            g = g.advanced_by(0.1);
        }
        assert!((g.sec - 600.0).abs() < 1e-9);
    }

    #[test]
    fn diff_spans_weeks() {
        let a = GpsTime { week: 10, sec: 10.0 };
        let b = GpsTime { week: 9, sec: SECONDS_IN_WEEK - 10.0 };
        assert!((a.diff(b) - 20.0).abs() < 1e-9);
    }
}
