//! Satellite channels: per-satellite modulation state, the ready-to-emit
//! word ring, and the visibility-driven scheduler.

use serde::Deserialize;

use crate::ca::generate_code;
use crate::constants::{
    CARR_TO_CODE, CA_SEQ_LEN, CODE_FREQ, LAMBDA_L1, MAX_CHAN, MAX_SAT, N_DWRD, N_DWRD_SBF, N_SBF,
    SPEED_OF_LIGHT,
};
use crate::ephemeris::{Ephemeris, IonoUtc};
use crate::geodesy::{AzEl, Ecef};
use crate::navmsg::{compute_checksum, eph_to_subframes, Subframes};
use crate::propagation::{check_sat_visibility, compute_range, Range};
use crate::time::GpsTime;

/// Carrier-phase representation, selected once per run.
///
/// The two forms are not arithmetically equivalent: the float form allows
/// fractional table indexing, the fixed form hard-quantizes the index to
/// 9 bits. The float form is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseMode {
    #[default]
    Float,
    Fixed,
}

/// Per-channel carrier-phase accumulator.
#[derive(Clone, Copy, Debug)]
pub enum CarrierPhase {
    /// Phase in cycles, wrapped into [0, 1).
    Float(f64),
    /// 32-bit accumulator; the table index is bits 24:16. The step is
    /// refreshed from the carrier frequency every iteration.
    Fixed { acc: u32, step: i32 },
}

/// One satellite channel. A channel is allocated iff `prn != 0`.
#[derive(Clone, Debug)]
pub struct Channel {
    pub prn: u8,
    /// C/A chips as 0/1.
    pub ca: [u8; CA_SEQ_LEN],
    /// Carrier Doppler [Hz].
    pub f_carr: f64,
    /// Code frequency [chips/s].
    pub f_code: f64,
    pub carr_phase: CarrierPhase,
    /// Code phase [chips], in [0, 1023).
    pub code_phase: f64,
    /// Data-bit reference time: the 30 s frame boundary of the current
    /// message batch.
    pub g0: GpsTime,
    /// Raw subframe images for this satellite.
    pub sbf: Subframes,
    /// Ring of parity-encoded words ready to emit.
    pub dwrd: [u32; N_DWRD],
    /// Word cursor into `dwrd`.
    pub iword: usize,
    /// Bit cursor within the current word.
    pub ibit: usize,
    /// Code-period counter within the current bit.
    pub icode: usize,
    /// Current data bit, +/-1.
    pub data_bit: i32,
    /// Current code chip, +/-1.
    pub code_chip: i32,
    pub azel: AzEl,
    /// Pseudorange at the previous outer update.
    pub rho0: Range,
}

impl Channel {
    fn idle(mode: PhaseMode) -> Channel {
        Channel {
            prn: 0,
            ca: [0; CA_SEQ_LEN],
            f_carr: 0.0,
            f_code: CODE_FREQ,
            carr_phase: match mode {
                PhaseMode::Float => CarrierPhase::Float(0.0),
                PhaseMode::Fixed => CarrierPhase::Fixed { acc: 0, step: 0 },
            },
            code_phase: 0.0,
            g0: GpsTime::default(),
            sbf: [[0; N_DWRD_SBF]; N_SBF],
            dwrd: [0; N_DWRD],
            iword: 0,
            ibit: 0,
            icode: 0,
            data_bit: 1,
            code_chip: 1,
            azel: AzEl::default(),
            rho0: Range::default(),
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.prn != 0
    }

    /// Regenerate the channel's ready-to-emit words for the 30 s frame at
    /// `g`. With `init` the tail subframe is built from the subframe 5
    /// image; otherwise the previous batch's last subframe is carried
    /// over so the stream stays continuous across the boundary.
    pub fn generate_nav_msg(&mut self, g: GpsTime, init: bool) {
        let g0 = GpsTime {
            week: g.week,
            // Align to the 30 s frame length.
            sec: (((g.sec + 0.5) as u64 / 30) * 30) as f64,
        };
        self.g0 = g0;

        let wn = (g0.week % 1024) as u32;
        let mut tow = (g0.sec as u32) / 6;

        let mut prevwrd = 0u32;

        if init {
            for iwrd in 0..N_DWRD_SBF {
                let mut sbfwrd = self.sbf[N_SBF - 1][iwrd];

                // TOW count into the HOW.
                if iwrd == 1 {
                    sbfwrd |= (tow & 0x1FFFF) << 13;
                }

                sbfwrd |= (prevwrd << 30) & 0xC000_0000;
                let nib = iwrd == 1 || iwrd == 9;
                self.dwrd[iwrd] = compute_checksum(sbfwrd, nib);
                prevwrd = self.dwrd[iwrd];
            }
        } else {
            for iwrd in 0..N_DWRD_SBF {
                self.dwrd[iwrd] = self.dwrd[N_SBF * N_DWRD_SBF + iwrd];
                prevwrd = self.dwrd[iwrd];
            }
        }

        for isbf in 0..N_SBF {
            tow += 1;

            for iwrd in 0..N_DWRD_SBF {
                let mut sbfwrd = self.sbf[isbf][iwrd];

                // Transmission week number into subframe 1.
                if isbf == 0 && iwrd == 2 {
                    sbfwrd |= (wn & 0x3FF) << 20;
                }

                if iwrd == 1 {
                    sbfwrd |= (tow & 0x1FFFF) << 13;
                }

                sbfwrd |= (prevwrd << 30) & 0xC000_0000;
                let nib = iwrd == 1 || iwrd == 9;
                self.dwrd[(isbf + 1) * N_DWRD_SBF + iwrd] = compute_checksum(sbfwrd, nib);
                prevwrd = self.dwrd[(isbf + 1) * N_DWRD_SBF + iwrd];
            }
        }
    }

    /// Reset the code phase, bit/word cursors and carrier/code rates from
    /// the fresh pseudorange `rho1`, `dt` seconds after the previous one.
    pub fn update_code_phase(&mut self, rho1: Range, dt: f64) {
        let rhorate = (rho1.range - self.rho0.range) / dt;

        self.f_carr = -rhorate / LAMBDA_L1;
        self.f_code = CODE_FREQ + self.f_carr * CARR_TO_CODE;

        // Elapsed navigation-message time at emission of the signal now
        // arriving, offset one subframe into the word ring.
        let ms = ((self.rho0.g.diff(self.g0) + 6.0) - self.rho0.range / SPEED_OF_LIGHT) * 1000.0;

        let mut ims = ms as i64;
        self.code_phase = (ms - ims as f64) * CA_SEQ_LEN as f64;

        self.iword = (ims / 600) as usize; // 1 word = 30 bits = 600 ms
        ims -= (self.iword as i64) * 600;

        self.ibit = (ims / 20) as usize; // 1 bit = 20 codes = 20 ms
        ims -= (self.ibit as i64) * 20;

        self.icode = ims as usize; // 1 code = 1 ms

        self.code_chip = i32::from(self.ca[self.code_phase as usize]) * 2 - 1;
        self.data_bit =
            (((self.dwrd[self.iword % N_DWRD] >> (29 - self.ibit)) & 0x1) as i32) * 2 - 1;

        self.rho0 = rho1;
    }
}

/// The fixed pool of satellite channels plus the PRN allocation table.
pub struct ChannelPool {
    pub channels: Vec<Channel>,
    /// Channel index per satellite slot (PRN - 1).
    pub allocated: [Option<usize>; MAX_SAT],
    mode: PhaseMode,
}

/// One row of the operator-facing channel table.
#[derive(Clone, Copy, Debug)]
pub struct ChannelInfo {
    pub prn: u8,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub distance: f64,
    pub iono_delay: f64,
}

impl ChannelPool {
    pub fn new(mode: PhaseMode) -> ChannelPool {
        ChannelPool {
            channels: (0..MAX_CHAN).map(|_| Channel::idle(mode)).collect(),
            allocated: [None; MAX_SAT],
            mode,
        }
    }

    /// One scheduling pass: assign newly visible satellites to free
    /// channels and release channels whose satellite has set. Returns the
    /// number of currently visible satellites.
    ///
    /// The elevation threshold used for allocation is zero; `elv_mask_deg`
    /// is accepted for interface compatibility but not applied.
    pub fn allocate(
        &mut self,
        eph_set: &[Ephemeris; MAX_SAT],
        ionoutc: &IonoUtc,
        grx: GpsTime,
        xyz: &Ecef,
        elv_mask_deg: f64,
    ) -> usize {
        let _ = elv_mask_deg;
        let mut nsat = 0;

        for sv in 0..MAX_SAT {
            match check_sat_visibility(&eph_set[sv], grx, xyz, 0.0) {
                Some(azel) => {
                    nsat += 1;

                    if self.allocated[sv].is_none() {
                        // Visible but not yet allocated.
                        if let Some(i) = self.channels.iter().position(|c| !c.is_allocated()) {
                            self.init_channel(i, sv, azel, &eph_set[sv], ionoutc, grx, xyz);
                            self.allocated[sv] = Some(i);
                        }
                    }
                }
                None => {
                    if let Some(i) = self.allocated[sv].take() {
                        // Set below the horizon: release the channel.
                        self.channels[i].prn = 0;
                    }
                }
            }
        }

        nsat
    }

    fn init_channel(
        &mut self,
        i: usize,
        sv: usize,
        azel: AzEl,
        eph: &Ephemeris,
        ionoutc: &IonoUtc,
        grx: GpsTime,
        xyz: &Ecef,
    ) {
        let chan = &mut self.channels[i];
        *chan = Channel::idle(self.mode);
        chan.prn = (sv + 1) as u8;
        chan.azel = azel;
        chan.ca = generate_code(chan.prn);
        chan.sbf = eph_to_subframes(eph, ionoutc);
        chan.generate_nav_msg(grx, true);

        let rho = compute_range(eph, ionoutc, grx, xyz);
        chan.rho0 = rho;
        let r_xyz = rho.range;

        // A reference pseudorange from the ECEF origin pins the absolute
        // carrier phase.
        let rho_ref = compute_range(eph, ionoutc, grx, &[0.0, 0.0, 0.0]);
        let r_ref = rho_ref.range;

        let phase_ini = (2.0 * r_ref - r_xyz) / LAMBDA_L1;
        let frac = phase_ini - phase_ini.floor();
        chan.carr_phase = match self.mode {
            PhaseMode::Float => CarrierPhase::Float(frac),
            PhaseMode::Fixed => CarrierPhase::Fixed {
                acc: (512.0 * 65536.0 * frac) as u32,
                step: 0,
            },
        };
    }

    pub fn iter_allocated(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_allocated())
    }

    /// Snapshot of the allocated channels for operator display.
    pub fn table(&self) -> Vec<ChannelInfo> {
        use crate::constants::R2D;
        self.iter_allocated()
            .map(|c| ChannelInfo {
                prn: c.prn,
                azimuth_deg: c.azel.az * R2D,
                elevation_deg: c.azel.el * R2D,
                distance: c.rho0.d,
                iono_delay: c.rho0.iono_delay,
            })
            .collect()
    }
}
