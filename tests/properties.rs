//! Whole-range property checks that are too heavy for inline unit tests.

use gps_sim::ca::generate_code;
use gps_sim::constants::{CA_SEQ_LEN, SECONDS_IN_WEEK};
use gps_sim::time::{DateTime, GpsTime};

#[test]
fn calendar_gps_roundtrip_1980_to_2099() {
    // Sweep the full supported era with a stride coprime to weeks and
    // months, plus assorted times of day.
    let times = [
        (0, 0, 0.0),
        (12, 30, 15.0),
        (23, 59, 59.0),
    ];

    let mut day = GpsTime { week: 0, sec: 0.0 };
    loop {
        let date = day.to_date();
        if date.y >= 2100 {
            break;
        }

        for &(hh, mm, sec) in &times {
            let t = DateTime {
                hh,
                mm,
                sec,
                ..date
            };
            let g = GpsTime::from_date(&t);
            let back = g.to_date();

            assert_eq!((back.y, back.m, back.d), (t.y, t.m, t.d), "date {t}");
            assert_eq!((back.hh, back.mm), (t.hh, t.mm), "time of {t}");
            assert!((back.sec - t.sec).abs() < 1e-3, "seconds of {t}");
        }

        day = day.advanced_by(37.0 * 86_400.0);
    }
}

#[test]
fn gps_calendar_roundtrip_over_weeks() {
    for week in (0..10_000).step_by(97) {
        for sec in [0.0, 1.0, 43_200.5, 302_399.0, 604_799.0] {
            let g = GpsTime { week, sec };
            let back = GpsTime::from_date(&g.to_date());
            assert_eq!(back.week, week, "week {week} sec {sec}");
            assert!(
                (back.sec - sec).abs() < 1e-3,
                "week {week} sec {sec} -> {}",
                back.sec
            );
            assert!(back.sec >= 0.0 && back.sec < SECONDS_IN_WEEK);
        }
    }
}

#[test]
fn ca_code_family_balance_and_cross_correlation() {
    let codes: Vec<[u8; CA_SEQ_LEN]> = (1..=32).map(generate_code).collect();

    for (i, code) in codes.iter().enumerate() {
        let ones: usize = code.iter().map(|&c| c as usize).sum();
        assert_eq!(ones, 512, "PRN {} balance", i + 1);
    }

    // Gold-family cross-correlation is three-valued over a full period.
    for a in 0..codes.len() {
        for b in (a + 1)..codes.len() {
            let mut acc = 0i32;
            for k in 0..CA_SEQ_LEN {
                let x = i32::from(codes[a][k]) * 2 - 1;
                let y = i32::from(codes[b][k]) * 2 - 1;
                acc += x * y;
            }
            assert!(
                acc == -65 || acc == -1 || acc == 63,
                "PRN {} x PRN {}: {}",
                a + 1,
                b + 1,
                acc
            );
        }
    }
}
