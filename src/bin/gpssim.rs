use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use gps_sim::config::SimConfig;
use gps_sim::constants::{NUM_SAMPLES, R2D};
use gps_sim::exchange::Exchange;
use gps_sim::fetch::daily_fetch_plan;
use gps_sim::geodesy::geodetic_to_ecef;
use gps_sim::motion::{read_nmea_gga, read_user_motion};
use gps_sim::rinex::load_nav_file;
use gps_sim::sim::{Scenario, Simulator};
use gps_sim::sink::open_sink;
use gps_sim::time::{DateTime, GpsTime};

#[derive(Parser, Debug)]
#[command(name = "gpssim", about = "GPS L1 C/A baseband signal simulator")]
struct Args {
    /// RINEX navigation file for GPS ephemerides.
    #[arg(short = 'e', value_name = "file")]
    nav_file: Option<PathBuf>,

    /// Pull the current navigation file from the daily archive.
    #[arg(short = 'f')]
    fetch: bool,

    /// Treat the navigation file as RINEX version 3.
    #[arg(short = '3')]
    rinex3: bool,

    /// User motion CSV (t,x,y,z at 10 Hz); enables dynamic mode.
    #[arg(short = 'u', value_name = "file")]
    motion_file: Option<PathBuf>,

    /// Trajectory as an NMEA GGA stream.
    #[arg(short = 'g', value_name = "file")]
    nmea_file: Option<PathBuf>,

    /// Static ECEF position "x,y,z" in metres.
    #[arg(short = 'c', value_name = "x,y,z", allow_hyphen_values = true)]
    ecef: Option<String>,

    /// Static geodetic position "lat,lon,hgt" (degrees, metres).
    #[arg(short = 'l', value_name = "lat,lon,hgt", allow_hyphen_values = true)]
    llh: Option<String>,

    /// Scenario start time YYYY/MM/DD,hh:mm:ss.
    #[arg(short = 't', value_name = "date,time")]
    start: Option<String>,

    /// Start time with TOC/TOE overwrite; 'now' uses the current UTC time.
    #[arg(short = 'T', value_name = "date,time")]
    start_overwrite: Option<String>,

    /// Sampling frequency [Hz].
    #[arg(short = 's', value_name = "freq", default_value_t = 2_600_000.0)]
    fs: f64,

    /// Disable the ionospheric delay model.
    #[arg(short = 'i')]
    iono_disable: bool,

    /// Show details about the simulated channels.
    #[arg(short = 'v')]
    verbose: bool,

    /// TX attenuation [dB], clamped to [-80, 0].
    #[arg(short = 'A', value_name = "dB", default_value_t = -20.0, allow_hyphen_values = true)]
    tx_gain_db: f64,

    /// RF bandwidth [MHz], clamped to [1.0, 5.0].
    #[arg(short = 'B', value_name = "MHz", default_value_t = 3.0)]
    bw_mhz: f64,

    /// Transmit backend URI (file:<path>, stdout:, or a radio URI).
    #[arg(short = 'U', value_name = "uri")]
    uri: Option<String>,

    /// Radio backend network name.
    #[arg(short = 'N', value_name = "host", default_value = "pluto.local")]
    hostname: String,
}

/// Parse and validate "YYYY/MM/DD,hh:mm:ss".
fn parse_datetime(s: &str) -> anyhow::Result<DateTime> {
    let (date, time) = s.split_once(',').context("expected YYYY/MM/DD,hh:mm:ss")?;
    let d: Vec<&str> = date.split('/').collect();
    let t: Vec<&str> = time.split(':').collect();
    if d.len() != 3 || t.len() != 3 {
        bail!("expected YYYY/MM/DD,hh:mm:ss");
    }

    let dt = DateTime {
        y: d[0].trim().parse()?,
        m: d[1].trim().parse()?,
        d: d[2].trim().parse()?,
        hh: t[0].trim().parse()?,
        mm: t[1].trim().parse()?,
        sec: t[2].trim().parse::<f64>()?.floor(),
    };

    if dt.y <= 1980
        || !(1..=12).contains(&dt.m)
        || !(1..=31).contains(&dt.d)
        || !(0..=23).contains(&dt.hh)
        || !(0..=59).contains(&dt.mm)
        || !(0.0..60.0).contains(&dt.sec)
    {
        bail!("invalid date and time");
    }
    Ok(dt)
}

fn parse_triple(s: &str) -> anyhow::Result<[f64; 3]> {
    let v: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .context("expected three comma-separated numbers")?;
    if v.len() != 3 {
        bail!("expected three comma-separated numbers");
    }
    Ok([v[0], v[1], v[2]])
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.fs < 1_000_000.0 {
        bail!("invalid sampling frequency (minimum 1000000 Hz)");
    }

    // Receiver position: trajectory file, explicit position, or the
    // default static location (Tokyo).
    let positions = if let Some(path) = &args.motion_file {
        let xyz = read_user_motion(path)?;
        eprintln!("Using user motion mode.");
        xyz
    } else if let Some(path) = &args.nmea_file {
        let xyz = read_nmea_gga(path)?;
        eprintln!("Using NMEA GGA motion mode.");
        xyz
    } else {
        let xyz = if let Some(spec) = &args.ecef {
            parse_triple(spec).context("-c")?
        } else {
            let llh_deg = match &args.llh {
                Some(spec) => parse_triple(spec).context("-l")?,
                None => [35.681298, 139.766247, 10.0],
            };
            geodetic_to_ecef(&[llh_deg[0] / R2D, llh_deg[1] / R2D, llh_deg[2]])
        };
        eprintln!("Using static location mode.");
        vec![xyz]
    };

    // Scenario anchor time.
    let overwrite = args.start_overwrite.is_some();
    let anchor = match (&args.start_overwrite, &args.start) {
        (Some(spec), _) => {
            let dt = if spec == "now" {
                DateTime::now_utc()
            } else {
                parse_datetime(spec).context("-T")?
            };
            Some(GpsTime::from_date(&dt))
        }
        (None, Some(spec)) => Some(GpsTime::from_date(&parse_datetime(spec).context("-t")?)),
        (None, None) => None,
    };

    // Navigation data: explicit file, or the well-known path a fetch
    // collaborator fills.
    let nav_path = match (&args.nav_file, args.fetch) {
        (Some(path), _) => path.clone(),
        (None, true) => {
            let plan = daily_fetch_plan(args.rinex3);
            eprintln!(
                "Fetching {} ({}) -> {}",
                plan.url, plan.station.name, plan.local_path
            );
            PathBuf::from(plan.local_path)
        }
        (None, false) => bail!("GPS ephemeris file is not specified (-e or -f)"),
    };

    let nav = load_nav_file(&nav_path, args.rinex3).map_err(|e| {
        if args.fetch {
            let plan = daily_fetch_plan(args.rinex3);
            anyhow::Error::from(e).context(format!(
                "navigation file not available at {}; retrieve {} first",
                nav_path.display(),
                plan.url
            ))
        } else {
            e.into()
        }
    })?;

    let cfg = SimConfig {
        fs_hz: args.fs,
        bw_hz: args.bw_mhz.clamp(1.0, 5.0) * 1e6,
        tx_gain_db: args.tx_gain_db.clamp(-80.0, 0.0),
        uri: args.uri.clone(),
        hostname: args.hostname.clone(),
        iono_enable: !args.iono_disable,
        verbose: args.verbose,
        ..Default::default()
    };

    let scenario = Scenario {
        positions,
        anchor,
        overwrite,
        elv_mask_deg: 0.0,
    };

    let sink_uri = cfg
        .uri
        .clone()
        .unwrap_or_else(|| format!("ip:{}", cfg.hostname));
    let sink = open_sink(&sink_uri)?;

    let gain_db = cfg.tx_gain_db;
    let mut sim = Simulator::new(cfg, nav, scenario)?;

    // Start-up banner.
    let (t0, g0) = sim.start_time();
    eprintln!("Gain: {gain_db:.1}dB");
    if !sim.nav_date().is_empty() {
        eprintln!("RINEX date = {}", sim.nav_date());
    }
    eprintln!("Start time = {t0} ({}:{:.0})", g0.week, g0.sec);

    if args.verbose && sim.ionoutc().valid {
        let io = sim.ionoutc();
        eprintln!(
            "  {:12.3e} {:12.3e} {:12.3e} {:12.3e}",
            io.alpha0, io.alpha1, io.alpha2, io.alpha3
        );
        eprintln!(
            "  {:12.3e} {:12.3e} {:12.3e} {:12.3e}",
            io.beta0, io.beta1, io.beta2, io.beta3
        );
        eprintln!(
            "   {:19.11e} {:19.11e}  {:9} {:9}",
            io.a0, io.a1, io.tot, io.wnt
        );
        eprintln!("{:6}", io.dtls);
    }

    eprintln!("PRN   Az    El     Range     Iono");
    for row in sim.channel_table() {
        eprintln!(
            "{:02} {:6.1} {:5.1} {:11.1} {:5.1}",
            row.prn, row.azimuth_deg, row.elevation_deg, row.distance, row.iono_delay
        );
    }

    // Frame exchange plus signal-driven shutdown.
    let exchange = Exchange::new(NUM_SAMPLES);
    {
        let exchange = Arc::clone(&exchange);
        ctrlc::set_handler(move || {
            eprintln!("\nShutting down...");
            exchange.request_stop();
        })
        .context("set signal handler")?;
    }

    sim.run(&exchange, sink)?;
    Ok(())
}
