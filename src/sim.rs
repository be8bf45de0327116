//! Orchestration: start-time selection, ephemeris-set tracking, the
//! synthesis loop and its 30-second maintenance work.

use std::sync::Arc;
use std::thread;

use log::{debug, info};

use crate::channel::{ChannelInfo, ChannelPool};
use crate::config::SimConfig;
use crate::constants::{MAX_CHAN, SECONDS_IN_HOUR};
use crate::dac::DacModel;
use crate::ephemeris::IonoUtc;
use crate::error::Error;
use crate::exchange::Exchange;
use crate::geodesy::Ecef;
use crate::modulator::{IqSample, Modulator};
use crate::navmsg::eph_to_subframes;
use crate::propagation::compute_range;
use crate::rinex::NavData;
use crate::sink::{run_consumer, TxSink};
use crate::time::{DateTime, GpsTime};

/// Scenario inputs: where the receiver is and when the simulation runs.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Receiver trajectory at the 10 Hz iteration cadence; a single
    /// entry means a static receiver. The trajectory wraps around.
    pub positions: Vec<Ecef>,
    /// Simulation start in GPS time; `None` starts at the earliest
    /// ephemeris.
    pub anchor: Option<GpsTime>,
    /// Shift every ephemeris TOC/TOE so the broadcast file serves the
    /// requested start time.
    pub overwrite: bool,
    /// Elevation mask [deg] handed to the scheduler.
    pub elv_mask_deg: f64,
}

/// The signal-synthesis engine. Owns all ephemeris, channel and
/// scheduler state; only the sample frames leave it, through the
/// exchange.
pub struct Simulator {
    cfg: SimConfig,
    nav: NavData,
    scenario: Scenario,
    pool: ChannelPool,
    dac: &'static DacModel,
    gains: [f64; MAX_CHAN],
    /// Index of the ephemeris set in service.
    ieph: usize,
    /// Simulated receive time of the next frame.
    grx: GpsTime,
    /// Scenario start.
    g0: GpsTime,
    t0: DateTime,
    /// Trajectory cursor.
    iumd: usize,
}

impl Simulator {
    pub fn new(cfg: SimConfig, mut nav: NavData, scenario: Scenario) -> Result<Simulator, Error> {
        if cfg.fs_hz < 1_000_000.0 {
            return Err(Error::InvalidSampleRate);
        }
        if scenario.positions.is_empty() {
            return Err(Error::InvalidTime);
        }

        nav.ionoutc.enable = cfg.iono_enable;

        if nav.sets.is_empty() {
            return Err(Error::NoEphemeris);
        }

        // Ephemeris coverage window from the first valid record of the
        // first and last sets.
        let first = nav.sets[0]
            .iter()
            .find(|e| e.valid)
            .ok_or(Error::NoEphemeris)?;
        let (gmin, tmin) = (first.toc, first.t);
        let (gmax, tmax) = nav
            .sets
            .last()
            .and_then(|set| set.iter().find(|e| e.valid))
            .map(|e| (e.toc, e.t))
            .unwrap_or((gmin, tmin));

        let (g0, t0) = match scenario.anchor {
            Some(anchor) => {
                if scenario.overwrite {
                    // Align the anchor to the two-hour ephemeris cadence
                    // and shift the whole table onto it.
                    let aligned = GpsTime {
                        week: anchor.week,
                        sec: f64::from((anchor.sec as i32) / 7200 * 7200),
                    };
                    let dsec = aligned.diff(gmin);

                    nav.ionoutc.wnt = aligned.week;
                    nav.ionoutc.tot = aligned.sec as i32;

                    for set in nav.sets.iter_mut() {
                        for eph in set.iter_mut().filter(|e| e.valid) {
                            eph.toc = eph.toc.advanced_by(dsec);
                            eph.t = eph.toc.to_date();
                            eph.toe = eph.toe.advanced_by(dsec);
                        }
                    }
                    info!("ephemeris table shifted by {dsec:.0} s");
                } else if anchor.diff(gmin) < 0.0 || gmax.diff(anchor) < 0.0 {
                    return Err(Error::AnchorOutsideWindow {
                        min: format!("{tmin} ({}:{:.0})", gmin.week, gmin.sec),
                        max: format!("{tmax} ({}:{:.0})", gmax.week, gmax.sec),
                    });
                }
                (anchor, anchor.to_date())
            }
            None => (gmin, tmin),
        };

        // Pick the set whose first valid TOC brackets the start time.
        let mut ieph = None;
        'sets: for (i, set) in nav.sets.iter().enumerate() {
            for eph in set.iter().filter(|e| e.valid) {
                let dt = g0.diff(eph.toc);
                if (-SECONDS_IN_HOUR..SECONDS_IN_HOUR).contains(&dt) {
                    ieph = Some(i);
                    break 'sets;
                }
            }
        }
        let ieph = ieph.ok_or(Error::NoCurrentSet)?;

        let mut sim = Simulator {
            dac: cfg.dac.model(),
            pool: ChannelPool::new(cfg.phase_mode),
            cfg,
            nav,
            scenario,
            gains: [0.0; MAX_CHAN],
            ieph,
            grx: g0,
            g0,
            t0,
            iumd: 0,
        };

        // Initial allocation pass at the scenario start.
        let xyz = sim.scenario.positions[0];
        let nsat = sim.pool.allocate(
            &sim.nav.sets[sim.ieph],
            &sim.nav.ionoutc,
            sim.grx,
            &xyz,
            sim.scenario.elv_mask_deg,
        );
        info!("{nsat} satellites visible at start");

        // The first synthesized frame is observed one iteration later.
        sim.grx = sim.grx.advanced_by(0.1);

        Ok(sim)
    }

    pub fn start_time(&self) -> (DateTime, GpsTime) {
        (self.t0, self.g0)
    }

    pub fn receiver_time(&self) -> GpsTime {
        self.grx
    }

    pub fn nav_date(&self) -> &str {
        &self.nav.date
    }

    pub fn ionoutc(&self) -> &IonoUtc {
        &self.nav.ionoutc
    }

    pub fn channel_table(&self) -> Vec<ChannelInfo> {
        self.pool.table()
    }

    fn position(&self) -> Ecef {
        self.scenario.positions[self.iumd]
    }

    /// Refresh every allocated channel's range, rates and gain at the
    /// current receive time.
    fn update_channels(&mut self) {
        let modulator = Modulator::new(self.dac, self.cfg.fs_hz);
        let xyz = self.position();
        let eph_set = &self.nav.sets[self.ieph];

        for (chan, gain) in self.pool.channels.iter_mut().zip(self.gains.iter_mut()) {
            if !chan.is_allocated() {
                continue;
            }
            let sv = (chan.prn - 1) as usize;
            let rho = compute_range(&eph_set[sv], &self.nav.ionoutc, self.grx, &xyz);
            *gain = modulator.update_channel(chan, rho, 0.1);
        }
    }

    /// Synthesize the current 100 ms frame into `buf`.
    fn fill_frame(&mut self, buf: &mut [IqSample]) {
        let modulator = Modulator::new(self.dac, self.cfg.fs_hz);
        modulator.fill(&mut self.pool.channels, &self.gains, buf);
    }

    /// Every 30 simulated seconds: roll the navigation message forward,
    /// advance to the next ephemeris set when it comes into window, and
    /// re-run the scheduler.
    fn maintenance(&mut self) {
        let igrx = (self.grx.sec * 10.0 + 0.5) as i64;
        if igrx % 300 != 0 {
            return;
        }

        for chan in self.pool.channels.iter_mut() {
            if chan.is_allocated() {
                chan.generate_nav_msg(self.grx, false);
            }
        }

        if self.ieph + 1 < self.nav.sets.len() {
            let next_toc = self.nav.sets[self.ieph + 1]
                .iter()
                .find(|e| e.valid)
                .map(|e| e.toc);
            if let Some(toc) = next_toc {
                if toc.diff(self.grx) < SECONDS_IN_HOUR {
                    self.ieph += 1;
                    let set = &self.nav.sets[self.ieph];
                    for chan in self.pool.channels.iter_mut() {
                        if chan.is_allocated() {
                            let sv = (chan.prn - 1) as usize;
                            chan.sbf = eph_to_subframes(&set[sv], &self.nav.ionoutc);
                        }
                    }
                    debug!("advanced to ephemeris set {}", self.ieph);
                }
            }
        }

        let xyz = self.position();
        let nsat = self.pool.allocate(
            &self.nav.sets[self.ieph],
            &self.nav.ionoutc,
            self.grx,
            &xyz,
            self.scenario.elv_mask_deg,
        );

        if self.cfg.verbose {
            for row in self.channel_table() {
                debug!(
                    "ch PRN {:02} az {:6.1} el {:5.1} d {:11.1} iono {:5.1}",
                    row.prn, row.azimuth_deg, row.elevation_deg, row.distance, row.iono_delay
                );
            }
        }
        debug!("maintenance at {:.1} s: {nsat} visible", self.grx.sec);
    }

    /// Advance simulated reception time by one iteration (0.1 s) and
    /// step the trajectory.
    fn advance(&mut self) {
        self.grx = self.grx.advanced_by(0.1);
        self.iumd += 1;
        if self.iumd >= self.scenario.positions.len() {
            self.iumd = 0;
        }
    }

    /// One full synthesis iteration into a caller-supplied frame.
    pub fn step(&mut self, buf: &mut [IqSample]) {
        self.update_channels();
        self.fill_frame(buf);
        self.maintenance();
        self.advance();
    }

    /// Produce frames through the exchange until it is stopped, with the
    /// sink running on its own thread.
    pub fn run(&mut self, exchange: &Arc<Exchange>, sink: Box<dyn TxSink>) -> Result<(), Error> {
        let consumer = {
            let ex = Arc::clone(exchange);
            thread::Builder::new()
                .name("sink".to_string())
                .spawn(move || run_consumer(ex, sink))?
        };

        loop {
            self.update_channels();
            if !exchange.produce(|buf| self.fill_frame(buf)) {
                break;
            }
            self.maintenance();
            self.advance();
        }

        exchange.request_stop();
        consumer.join().map_err(|_| {
            Error::Backend("sink thread panicked".to_string())
        })?;

        info!("synthesis stopped at {:.1} s", self.grx.sec);
        Ok(())
    }
}
