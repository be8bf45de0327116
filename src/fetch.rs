//! Daily broadcast-ephemeris retrieval plan.
//!
//! The transfer itself is a collaborator's job; this module owns the
//! ground-station directory and composes the archive URL and the
//! well-known local path the payload is expected to land on.

use chrono::{Datelike, Duration, Timelike, Utc};
use once_cell::sync::Lazy;

const RINEX_FTP_URL: &str = "ftp://igs.bkg.bund.de/IGS/";
const RINEX2_SUBFOLDER: &str = "nrt";
const RINEX3_SUBFOLDER: &str = "nrt_v3";

/// Local paths the fetched (still gzipped) navigation files land on.
pub const RINEX2_FILE_NAME: &str = "rinex2.gz";
pub const RINEX3_FILE_NAME: &str = "rinex3.gz";

/// One entry of the ground-station directory.
#[derive(Clone, Debug)]
pub struct Station {
    /// 4-character station id.
    pub id_v2: String,
    /// 9-character station id.
    pub id_v3: String,
    pub name: String,
    /// Whether the station's files carry ionosphere data.
    pub has_ionodata: bool,
    /// Whether the station serves RINEX v3.
    pub serves_v3: bool,
}

static STATIONS: Lazy<Vec<Station>> = Lazy::new(|| {
    // fmt,id_v2,id_v3,name,has_iono -- the name itself may contain commas.
    include_str!("../assets/stations.csv")
        .lines()
        .filter_map(|line| {
            let mut head = line.splitn(4, ',');
            let fmt = head.next()?;
            let id_v2 = head.next()?.to_string();
            let id_v3 = head.next()?.to_string();
            let rest = head.next()?;
            let (name, iono) = rest.rsplit_once(',')?;
            Some(Station {
                id_v2,
                id_v3,
                name: name.to_string(),
                has_ionodata: iono == "true",
                serves_v3: fmt == "3",
            })
        })
        .collect()
});

/// The full station directory.
pub fn stations() -> &'static [Station] {
    &STATIONS
}

pub fn find_station(id_v2: &str) -> Option<&'static Station> {
    STATIONS.iter().find(|s| s.id_v2 == id_v2)
}

/// A composed retrieval: where the current navigation file lives on the
/// archive and where the collaborator is expected to place it locally.
#[derive(Clone, Debug)]
pub struct FetchPlan {
    pub url: String,
    pub local_path: &'static str,
    pub station: &'static Station,
}

/// Compose the archive location of the most recent hourly navigation
/// file. The previous hour is used because the current one is still
/// being written.
pub fn daily_fetch_plan(v3: bool) -> FetchPlan {
    // Default stations mirror long-standing practice: brst for v2,
    // func for v3.
    let station = if v3 {
        find_station("func").or_else(|| STATIONS.iter().find(|s| s.serves_v3))
    } else {
        find_station("brst").or_else(|| STATIONS.iter().find(|s| !s.serves_v3))
    }
    .expect("station directory is non-empty");

    let prev_hour = Utc::now() - Duration::hours(1);
    let doy = prev_hour.ordinal();
    let hour = prev_hour.hour();
    let yy = prev_hour.year() % 100;

    let subfolder = if v3 { RINEX3_SUBFOLDER } else { RINEX2_SUBFOLDER };
    let hour_letter = (b'a' + hour as u8) as char;

    FetchPlan {
        url: format!(
            "{RINEX_FTP_URL}{subfolder}/{doy:03}/{hour:02}/{}{doy:03}{hour_letter}.{yy:02}n.gz",
            station.id_v2
        ),
        local_path: if v3 { RINEX3_FILE_NAME } else { RINEX2_FILE_NAME },
        station,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_loaded() {
        assert!(stations().len() > 300);
        let brst = find_station("brst").unwrap();
        assert_eq!(brst.id_v3, "BRST00FRA");
        assert!(!brst.serves_v3);

        // Names with embedded commas survive the parse.
        let abpo = find_station("abpo").unwrap();
        assert_eq!(abpo.name, "Ambohimpanompo, Mada");
        assert!(abpo.has_ionodata);
    }

    #[test]
    fn v3_stations_present() {
        let func = find_station("func").unwrap();
        assert!(func.serves_v3);
    }

    #[test]
    fn plan_shape() {
        let plan = daily_fetch_plan(false);
        assert!(plan.url.starts_with("ftp://igs.bkg.bund.de/IGS/nrt/"));
        assert!(plan.url.ends_with("n.gz"));
        assert_eq!(plan.local_path, RINEX2_FILE_NAME);

        let plan3 = daily_fetch_plan(true);
        assert!(plan3.url.contains("/nrt_v3/"));
        assert_eq!(plan3.local_path, RINEX3_FILE_NAME);
    }
}
