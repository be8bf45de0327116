//! RINEX navigation-file ingest (versions 2 and 3).
//!
//! Both grammars are line oriented with fixed-column fields and a header
//! keyed by tags in columns 61-80. Floats use 'D' as the exponent
//! designator. Records are grouped into hourly "sets": a new set starts
//! whenever a record's time of clock is more than an hour past the
//! current set's anchor.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;

use crate::constants::{EPHEM_ARRAY_SIZE, MAX_SAT, SECONDS_IN_HOUR};
use crate::ephemeris::{Ephemeris, IonoUtc};
use crate::error::Error;
use crate::time::{DateTime, GpsTime};

/// One hourly set: 32 slots indexed by PRN - 1, invalid where absent.
pub type EphemerisSet = [Ephemeris; MAX_SAT];

/// Everything decoded from one navigation file.
#[derive(Clone, Debug, Default)]
pub struct NavData {
    pub sets: Vec<EphemerisSet>,
    pub ionoutc: IonoUtc,
    /// The `PGM / RUN BY / DATE` stamp, echoed in the start-up banner.
    pub date: String,
}

/// Open a navigation file, transparently un-gzipping when the stream
/// carries the gzip magic, and parse it with the selected grammar.
pub fn load_nav_file(path: &Path, v3: bool) -> Result<NavData, Error> {
    let file = File::open(path).map_err(|source| Error::NavFileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(file);
    let gzipped = reader.fill_buf().map(|b| b.starts_with(&[0x1f, 0x8b])).unwrap_or(false);

    let stream: Box<dyn Read> = if gzipped {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    let reader = BufReader::new(stream);
    if v3 {
        read_rinex3(reader)
    } else {
        read_rinex2(reader)
    }
}

/// Trimmed fixed-column field, tolerant of short lines.
fn field(line: &str, start: usize, len: usize) -> &str {
    if start >= line.len() {
        return "";
    }
    let end = (start + len).min(line.len());
    line.get(start..end).map(str::trim).unwrap_or("")
}

/// RINEX float: rewrite the 'D' exponent designator and parse; garbage
/// decodes as zero, matching the lenient decimal scanners these files
/// have always been read with.
fn parse_float(s: &str) -> f64 {
    let s = s.replace(['D', 'd'], "E");
    s.trim().parse().unwrap_or(0.0)
}

fn parse_int(s: &str) -> i32 {
    // Accept floats with integer value (IODE etc. are written as floats).
    parse_float(s) as i32
}

fn tag(line: &str) -> &str {
    line.get(60..).map(str::trim_end).unwrap_or("")
}

const FLAG_ALPHA: u8 = 0x1;
const FLAG_BETA: u8 = 0x2;
const FLAG_UTC: u8 = 0x4;
const FLAG_LEAP: u8 = 0x8;

struct BlockReader<R: BufRead> {
    reader: R,
    line: String,
}

impl<R: BufRead> BlockReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Read the next line into the internal buffer, stripping the line
    /// terminator. False at end of stream.
    fn read_next(&mut self) -> Result<bool, Error> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        if n == 0 {
            return Ok(false);
        }
        while self.line.ends_with('\n') || self.line.ends_with('\r') {
            self.line.pop();
        }
        Ok(true)
    }

    /// Next line, or `None` at end of stream.
    fn next_line(&mut self) -> Result<Option<&str>, Error> {
        Ok(if self.read_next()? {
            Some(&self.line)
        } else {
            None
        })
    }

    /// Continuation line of an ephemeris block; EOF here is a hard error.
    fn continuation(&mut self, prn: u8) -> Result<&str, Error> {
        if self.read_next()? {
            Ok(&self.line)
        } else {
            Err(Error::TruncatedBlock(prn))
        }
    }
}

/// Common post-decode step: health flagging and cached derivatives.
fn finalize_record(eph: &mut Ephemeris) {
    if eph.svhlth > 0 && eph.svhlth < 32 {
        // Set the summary bit (MSB of the 6-bit health word).
        eph.svhlth += 32;
    }
    eph.valid = true;
    eph.update_derived();
}

/// Track hourly set boundaries while records stream in.
struct SetBuilder {
    sets: Vec<EphemerisSet>,
    anchor: Option<GpsTime>,
}

impl SetBuilder {
    fn new() -> Self {
        Self {
            sets: Vec::new(),
            anchor: None,
        }
    }

    /// Slot for a record with time-of-clock `g`, or `None` once the set
    /// capacity of a daily file is exhausted.
    fn slot(&mut self, g: GpsTime, sv: usize) -> Option<&mut Ephemeris> {
        match self.anchor {
            None => {
                self.anchor = Some(g);
                self.sets.push([Ephemeris::default(); MAX_SAT]);
            }
            Some(anchor) => {
                if g.diff(anchor) > SECONDS_IN_HOUR {
                    self.anchor = Some(g);
                    if self.sets.len() >= EPHEM_ARRAY_SIZE {
                        return None;
                    }
                    self.sets.push([Ephemeris::default(); MAX_SAT]);
                }
            }
        }
        self.sets.last_mut().map(|set| &mut set[sv])
    }
}

/// Parse a RINEX version 2 GPS navigation stream.
pub fn read_rinex2<R: BufRead>(reader: R) -> Result<NavData, Error> {
    let mut r = BlockReader::new(reader);
    let mut ionoutc = IonoUtc::default();
    let mut date = String::new();
    let mut flags = 0u8;

    // Header.
    loop {
        let Some(line) = r.next_line()? else { break };
        match tag(line) {
            "END OF HEADER" => break,
            "COMMENT" => continue,
            "RINEX VERSION / TYPE" => {
                let ver = parse_float(field(line, 0, 9));
                if ver > 3.0 {
                    return Err(Error::RinexVersion(ver));
                }
                if line.as_bytes().get(20) != Some(&b'N') {
                    return Err(Error::RinexSystem);
                }
            }
            "PGM / RUN BY / DATE" => {
                date = field(line, 40, 20).to_string();
            }
            "ION ALPHA" => {
                ionoutc.alpha0 = parse_float(field(line, 2, 12));
                ionoutc.alpha1 = parse_float(field(line, 14, 12));
                ionoutc.alpha2 = parse_float(field(line, 26, 12));
                ionoutc.alpha3 = parse_float(field(line, 38, 12));
                flags |= FLAG_ALPHA;
            }
            "ION BETA" => {
                ionoutc.beta0 = parse_float(field(line, 2, 12));
                ionoutc.beta1 = parse_float(field(line, 14, 12));
                ionoutc.beta2 = parse_float(field(line, 26, 12));
                ionoutc.beta3 = parse_float(field(line, 38, 12));
                flags |= FLAG_BETA;
            }
            "DELTA-UTC: A0,A1,T,W" => {
                ionoutc.a0 = parse_float(field(line, 3, 19));
                ionoutc.a1 = parse_float(field(line, 22, 19));
                ionoutc.tot = parse_int(field(line, 41, 9));
                ionoutc.wnt = parse_int(field(line, 50, 9));
                if ionoutc.tot % 4096 == 0 {
                    flags |= FLAG_UTC;
                }
            }
            "LEAP SECONDS" => {
                ionoutc.dtls = parse_int(field(line, 0, 6));
                flags |= FLAG_LEAP;
            }
            _ => continue,
        }
    }

    ionoutc.valid = flags == FLAG_ALPHA | FLAG_BETA | FLAG_UTC | FLAG_LEAP;

    // Ephemeris blocks, 8 lines each.
    let mut builder = SetBuilder::new();
    loop {
        let Some(line) = r.next_line()? else { break };
        if line.trim().is_empty() {
            continue;
        }

        let prn = parse_int(field(line, 0, 2));
        if !(1..=MAX_SAT as i32).contains(&prn) {
            return Err(Error::RinexMalformed(format!("bad PRN field `{}`", field(line, 0, 2))));
        }
        let sv = (prn - 1) as usize;

        let t = DateTime {
            y: parse_int(field(line, 3, 2)) + 2000,
            m: parse_int(field(line, 6, 2)),
            d: parse_int(field(line, 9, 2)),
            hh: parse_int(field(line, 12, 2)),
            mm: parse_int(field(line, 15, 2)),
            // Field is four columns wide but only the integer part is
            // consumed, faithfully matching the long-standing reader.
            sec: f64::from(parse_int(field(line, 18, 2))),
        };
        let g = GpsTime::from_date(&t);

        let af0 = parse_float(field(line, 22, 19));
        let af1 = parse_float(field(line, 41, 19));
        let af2 = parse_float(field(line, 60, 19));

        let Some(eph) = builder.slot(g, sv) else { break };
        eph.t = t;
        eph.toc = g;
        eph.af0 = af0;
        eph.af1 = af1;
        eph.af2 = af2;

        let line = r.continuation(prn as u8)?;
        let o = [3usize, 22, 41, 60];
        let (iode, crs, deltan, m0) = (
            parse_int(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (cuc, ecc, cus, sqrta) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (toe_sec, cic, omg0, cis) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (inc0, crc, aop, omgdot) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (idot, code_l2, toe_week) = (
            parse_float(field(line, o[0], 19)),
            parse_int(field(line, o[1], 19)),
            parse_int(field(line, o[2], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (svhlth, tgd, iodc) = (
            parse_int(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_int(field(line, o[3], 19)),
        );

        // Reserved spare line closes the block.
        r.continuation(prn as u8)?;

        let eph = builder
            .sets
            .last_mut()
            .map(|set| &mut set[sv])
            .expect("slot() pushed a set");
        eph.iode = iode;
        eph.crs = crs;
        eph.deltan = deltan;
        eph.m0 = m0;
        eph.cuc = cuc;
        eph.ecc = ecc;
        eph.cus = cus;
        eph.sqrta = sqrta;
        eph.toe = GpsTime {
            week: toe_week,
            sec: toe_sec,
        };
        eph.cic = cic;
        eph.omg0 = omg0;
        eph.cis = cis;
        eph.inc0 = inc0;
        eph.crc = crc;
        eph.aop = aop;
        eph.omgdot = omgdot;
        eph.idot = idot;
        eph.code_l2 = code_l2;
        eph.svhlth = svhlth;
        eph.tgd = tgd;
        eph.iodc = iodc;
        finalize_record(eph);
    }

    debug!("RINEX v2: {} ephemeris set(s), iono/utc valid: {}", builder.sets.len(), ionoutc.valid);

    Ok(NavData {
        sets: builder.sets,
        ionoutc,
        date,
    })
}

/// Parse a RINEX version 3 GPS navigation stream.
pub fn read_rinex3<R: BufRead>(reader: R) -> Result<NavData, Error> {
    let mut r = BlockReader::new(reader);
    let mut ionoutc = IonoUtc::default();
    let mut date = String::new();
    let mut flags = 0u8;

    // Header.
    loop {
        let Some(line) = r.next_line()? else { break };
        match tag(line) {
            "END OF HEADER" => break,
            "COMMENT" => continue,
            "RINEX VERSION / TYPE" => {
                let ver = parse_float(field(line, 0, 9));
                if ver < 3.0 {
                    return Err(Error::RinexVersion(ver));
                }
                let b = line.as_bytes();
                if b.get(20) != Some(&b'N') && b.get(40) != Some(&b'G') {
                    return Err(Error::RinexSystem);
                }
            }
            "PGM / RUN BY / DATE" => {
                date = field(line, 40, 20).to_string();
            }
            "IONOSPHERIC CORR" => {
                if line.starts_with("GPSA") {
                    ionoutc.alpha0 = parse_float(field(line, 5, 12));
                    ionoutc.alpha1 = parse_float(field(line, 17, 12));
                    ionoutc.alpha2 = parse_float(field(line, 29, 12));
                    ionoutc.alpha3 = parse_float(field(line, 41, 12));
                    flags |= FLAG_ALPHA;
                } else if line.starts_with("GPSB") {
                    ionoutc.beta0 = parse_float(field(line, 5, 12));
                    ionoutc.beta1 = parse_float(field(line, 17, 12));
                    ionoutc.beta2 = parse_float(field(line, 29, 12));
                    ionoutc.beta3 = parse_float(field(line, 41, 12));
                    flags |= FLAG_BETA;
                }
            }
            "TIME SYSTEM CORR" => {
                if line.starts_with("GPUT") {
                    ionoutc.a0 = parse_float(field(line, 5, 17));
                    ionoutc.a1 = parse_float(field(line, 22, 16));
                    ionoutc.tot = parse_int(field(line, 38, 7));
                    ionoutc.wnt = parse_int(field(line, 45, 6));
                    if ionoutc.tot % 4096 == 0 {
                        flags |= FLAG_UTC;
                    }
                }
            }
            "LEAP SECONDS" => {
                ionoutc.dtls = parse_int(field(line, 0, 6));
                flags |= FLAG_LEAP;
            }
            _ => continue,
        }
    }

    ionoutc.valid = flags == FLAG_ALPHA | FLAG_BETA | FLAG_UTC | FLAG_LEAP;

    // Ephemeris blocks; non-GPS records are skipped by system letter.
    let mut builder = SetBuilder::new();
    loop {
        let Some(line) = r.next_line()? else { break };
        if !line.starts_with('G') {
            continue;
        }

        let prn = parse_int(field(line, 1, 2));
        if !(1..=MAX_SAT as i32).contains(&prn) {
            return Err(Error::RinexMalformed(format!("bad PRN field `{}`", field(line, 1, 2))));
        }
        let sv = (prn - 1) as usize;

        let t = DateTime {
            y: parse_int(field(line, 4, 4)),
            m: parse_int(field(line, 9, 2)),
            d: parse_int(field(line, 12, 2)),
            hh: parse_int(field(line, 15, 2)),
            mm: parse_int(field(line, 18, 2)),
            sec: f64::from(parse_int(field(line, 21, 2))),
        };
        let g = GpsTime::from_date(&t);

        let af0 = parse_float(field(line, 23, 19));
        let af1 = parse_float(field(line, 42, 19));
        let af2 = parse_float(field(line, 61, 19));

        let Some(eph) = builder.slot(g, sv) else { break };
        eph.t = t;
        eph.toc = g;
        eph.af0 = af0;
        eph.af1 = af1;
        eph.af2 = af2;

        let o = [4usize, 23, 42, 61];

        let line = r.continuation(prn as u8)?;
        let (iode, crs, deltan, m0) = (
            parse_int(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (cuc, ecc, cus, sqrta) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (toe_sec, cic, omg0, cis) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (inc0, crc, aop, omgdot) = (
            parse_float(field(line, o[0], 19)),
            parse_float(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_float(field(line, o[3], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (idot, code_l2, toe_week) = (
            parse_float(field(line, o[0], 19)),
            parse_int(field(line, o[1], 19)),
            parse_int(field(line, o[2], 19)),
        );

        let line = r.continuation(prn as u8)?;
        let (svhlth, tgd, iodc) = (
            parse_int(field(line, o[1], 19)),
            parse_float(field(line, o[2], 19)),
            parse_int(field(line, o[3], 19)),
        );

        r.continuation(prn as u8)?;

        let eph = builder
            .sets
            .last_mut()
            .map(|set| &mut set[sv])
            .expect("slot() pushed a set");
        eph.iode = iode;
        eph.crs = crs;
        eph.deltan = deltan;
        eph.m0 = m0;
        eph.cuc = cuc;
        eph.ecc = ecc;
        eph.cus = cus;
        eph.sqrta = sqrta;
        eph.toe = GpsTime {
            week: toe_week,
            sec: toe_sec,
        };
        eph.cic = cic;
        eph.omg0 = omg0;
        eph.cis = cis;
        eph.inc0 = inc0;
        eph.crc = crc;
        eph.aop = aop;
        eph.omgdot = omgdot;
        eph.idot = idot;
        eph.code_l2 = code_l2;
        eph.svhlth = svhlth;
        eph.tgd = tgd;
        eph.iodc = iodc;
        finalize_record(eph);
    }

    debug!("RINEX v3: {} ephemeris set(s), iono/utc valid: {}", builder.sets.len(), ionoutc.valid);

    Ok(NavData {
        sets: builder.sets,
        ionoutc,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn d19(x: f64) -> String {
        // 19-character float with the RINEX 'D' exponent designator.
        format!("{:>19}", format!("{:.12E}", x).replace('E', "D"))
    }

    fn v2_header() -> String {
        let mut h = String::new();
        h.push_str(&format!("{:<60}{}\n", "     2.11           N: GPS NAV DATA", "RINEX VERSION / TYPE"));
        h.push_str(&format!("{:<60}{}\n", "CCRINEXN V1.6.0 UX  CDDIS               20-DEC-14 01:20", "PGM / RUN BY / DATE"));
        h.push_str(&format!(
            "  {:>12}{:>12}{:>12}{:>12}{:>10}{}\n",
            "0.1118D-07", "0.2235D-07", "-0.1192D-06", "-0.1192D-06", "", "ION ALPHA"
        ));
        h.push_str(&format!(
            "  {:>12}{:>12}{:>12}{:>12}{:>10}{}\n",
            "0.9011D+05", "0.1638D+05", "-0.1966D+06", "-0.1311D+06", "", "ION BETA"
        ));
        h.push_str(&format!(
            "   {:>19}{:>19}{:>9}{:>9} {}\n",
            "0.186264514923D-08", "0.177635683940D-14", "503808", "1824", "DELTA-UTC: A0,A1,T,W"
        ));
        h.push_str(&format!("{:<60}{}\n", "    16", "LEAP SECONDS"));
        h.push_str(&format!("{:<60}{}\n", "", "END OF HEADER"));
        h
    }

    fn v2_block(prn: u8, hh: i32, toe_sec: f64, toe_week: i32) -> String {
        let mut b = String::new();
        b.push_str(&format!(
            "{:2} 14 12 20 {:2}  0  0.0{}{}{}\n",
            prn,
            hh,
            d19(-1.5e-4),
            d19(-2.0e-12),
            d19(0.0)
        ));
        // iode, crs, deltan, m0
        b.push_str(&format!("   {}{}{}{}\n", d19(44.0), d19(-60.0), d19(4.34e-9), d19(0.2)));
        // cuc, ecc, cus, sqrta
        b.push_str(&format!("   {}{}{}{}\n", d19(-3.0e-6), d19(0.004), d19(8.0e-6), d19(5153.7)));
        // toe, cic, omg0, cis
        b.push_str(&format!("   {}{}{}{}\n", d19(toe_sec), d19(1.0e-7), d19(1.5), d19(-2.0e-7)));
        // inc0, crc, aop, omgdot
        b.push_str(&format!("   {}{}{}{}\n", d19(0.96), d19(220.0), d19(1.0), d19(-8.0e-9)));
        // idot, codeL2, toe week, l2p
        b.push_str(&format!("   {}{}{}{}\n", d19(4.0e-10), d19(1.0), d19(f64::from(toe_week)), d19(0.0)));
        // accuracy, health, tgd, iodc
        b.push_str(&format!("   {}{}{}{}\n", d19(2.0), d19(0.0), d19(-1.0e-8), d19(44.0)));
        // transmission time, fit interval
        b.push_str(&format!("   {}{}\n", d19(toe_sec - 6.0), d19(4.0)));
        b
    }

    #[test]
    fn v2_parses_header_and_record() {
        let mut text = v2_header();
        text.push_str(&v2_block(3, 0, 518_400.0, 1824));
        let nav = read_rinex2(Cursor::new(text)).unwrap();

        assert!(nav.ionoutc.valid);
        assert_eq!(nav.ionoutc.dtls, 16);
        assert!((nav.ionoutc.alpha0 - 0.1118e-7).abs() < 1e-15);
        assert_eq!(nav.sets.len(), 1);

        let eph = &nav.sets[0][2];
        assert!(eph.valid);
        assert_eq!(eph.iode, 44);
        assert_eq!(eph.toe.week, 1824);
        assert!((eph.sqrta - 5153.7).abs() < 1e-6);
        assert!((eph.toc.sec - 518_400.0).abs() < 1e-6);
        // Derived values present.
        assert!(eph.a > 2.6e7);
        assert!(eph.n > 0.0);
        // Healthy SV keeps a zero health word.
        assert_eq!(eph.svhlth, 0);
    }

    #[test]
    fn v2_hourly_set_split() {
        let mut text = v2_header();
        text.push_str(&v2_block(1, 0, 518_400.0, 1824));
        text.push_str(&v2_block(1, 2, 525_600.0, 1824));
        let nav = read_rinex2(Cursor::new(text)).unwrap();
        assert_eq!(nav.sets.len(), 2);
        assert!(nav.sets[0][0].valid);
        assert!(nav.sets[1][0].valid);
    }

    #[test]
    fn v2_rejects_v3_version() {
        let text = format!("{:<60}{}\n", "     3.04           N: GPS NAV DATA", "RINEX VERSION / TYPE");
        match read_rinex2(Cursor::new(text)) {
            Err(Error::RinexVersion(v)) => assert!(v > 3.0),
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn v2_truncated_block_is_an_error() {
        let mut text = v2_header();
        let block = v2_block(5, 0, 518_400.0, 1824);
        let cut: String = block.lines().take(3).map(|l| format!("{l}\n")).collect();
        text.push_str(&cut);
        match read_rinex2(Cursor::new(text)) {
            Err(Error::TruncatedBlock(5)) => {}
            other => panic!("expected truncated block, got {other:?}"),
        }
    }

    #[test]
    fn unhealthy_sv_gets_summary_bit() {
        let mut text = v2_header();
        let block = v2_block(7, 0, 518_400.0, 1824).replace(&d19(0.0), &d19(1.0));
        text.push_str(&block);
        let nav = read_rinex2(Cursor::new(text)).unwrap();
        assert_eq!(nav.sets[0][6].svhlth, 33);
    }

    fn v3_header() -> String {
        let mut h = String::new();
        h.push_str(&format!("{:<60}{}\n", "     3.04           N: GNSS NAV DATA    G: GPS", "RINEX VERSION / TYPE"));
        h.push_str(&format!("{:<60}{}\n", "BCEmerge            congo               20141220 012902 GMT", "PGM / RUN BY / DATE"));
        h.push_str(&format!("{:<60}{}\n", "GPSA   1.1176E-08  2.2352E-08 -1.1921E-07 -1.1921E-07", "IONOSPHERIC CORR"));
        h.push_str(&format!("{:<60}{}\n", "GPSB   9.0112E+04  1.6384E+04 -1.9661E+05 -1.3107E+05", "IONOSPHERIC CORR"));
        h.push_str(&format!("{:<60}{}\n", "GPUT  1.8626451492E-09 1.776356839E-15 503808 1824", "TIME SYSTEM CORR"));
        h.push_str(&format!("{:<60}{}\n", "    16", "LEAP SECONDS"));
        h.push_str(&format!("{:<60}{}\n", "", "END OF HEADER"));
        h
    }

    fn e19(x: f64) -> String {
        format!("{:>19}", format!("{:.12E}", x))
    }

    fn v3_block(prn: u8) -> String {
        let mut b = String::new();
        b.push_str(&format!(
            "G{:02} 2014 12 20 00 00 00{}{}{}\n",
            prn,
            e19(-1.5e-4),
            e19(-2.0e-12),
            e19(0.0)
        ));
        b.push_str(&format!("    {}{}{}{}\n", e19(44.0), e19(-60.0), e19(4.34e-9), e19(0.2)));
        b.push_str(&format!("    {}{}{}{}\n", e19(-3.0e-6), e19(0.004), e19(8.0e-6), e19(5153.7)));
        b.push_str(&format!("    {}{}{}{}\n", e19(518_400.0), e19(1.0e-7), e19(1.5), e19(-2.0e-7)));
        b.push_str(&format!("    {}{}{}{}\n", e19(0.96), e19(220.0), e19(1.0), e19(-8.0e-9)));
        b.push_str(&format!("    {}{}{}{}\n", e19(4.0e-10), e19(1.0), e19(1824.0), e19(0.0)));
        b.push_str(&format!("    {}{}{}{}\n", e19(2.0), e19(0.0), e19(-1.0e-8), e19(44.0)));
        b.push_str(&format!("    {}{}\n", e19(518_394.0), e19(4.0)));
        b
    }

    #[test]
    fn v3_parses_record_and_skips_other_systems() {
        let mut text = v3_header();
        text.push_str("R01 2014 12 20 00 00 00  0.0 0.0 0.0\n");
        text.push_str(&v3_block(11));
        let nav = read_rinex3(Cursor::new(text)).unwrap();

        assert!(nav.ionoutc.valid);
        assert_eq!(nav.sets.len(), 1);
        let eph = &nav.sets[0][10];
        assert!(eph.valid);
        assert_eq!(eph.toe.week, 1824);
        assert!((eph.ecc - 0.004).abs() < 1e-12);
    }

    #[test]
    fn v3_rejects_v2_version() {
        let text = format!("{:<60}{}\n", "     2.11           N", "RINEX VERSION / TYPE");
        assert!(matches!(read_rinex3(Cursor::new(text)), Err(Error::RinexVersion(_))));
    }

    #[test]
    fn iono_utc_stays_invalid_when_incomplete() {
        let mut h = String::new();
        h.push_str(&format!("{:<60}{}\n", "     2.11           N: GPS NAV DATA", "RINEX VERSION / TYPE"));
        h.push_str(&format!("{:<60}{}\n", "    16", "LEAP SECONDS"));
        h.push_str(&format!("{:<60}{}\n", "", "END OF HEADER"));
        let nav = read_rinex2(Cursor::new(h)).unwrap();
        assert!(!nav.ionoutc.valid);
        assert_eq!(nav.ionoutc.dtls, 16);
    }
}
