//! The synthesis inner loop: sum every allocated channel's spread,
//! data-modulated carrier into quantized I/Q samples.

use num_complex::Complex;

use crate::channel::{CarrierPhase, Channel};
use crate::constants::{CA_SEQ_LEN, MAX_CHAN, N_DWRD};
use crate::dac::{antenna_gain, DacModel};
use crate::propagation::Range;

/// One interleaved output sample: I first, Q second on the wire.
pub type IqSample = Complex<i16>;

/// Stateless driver for the per-iteration channel refresh and the
/// per-sample accumulation.
pub struct Modulator<'a> {
    dac: &'a DacModel,
    /// Sample period [s].
    delt: f64,
}

impl<'a> Modulator<'a> {
    pub fn new(dac: &'a DacModel, fs: f64) -> Modulator<'a> {
        Modulator {
            dac,
            delt: 1.0 / fs,
        }
    }

    /// Outer update, once per 0.1 s iteration: refresh the channel's code
    /// phase and rates from the new pseudorange and return its linear
    /// signal gain.
    pub fn update_channel(&self, chan: &mut Channel, rho: Range, dt: f64) -> f64 {
        chan.azel = rho.azel;
        chan.update_code_phase(rho, dt);

        if let CarrierPhase::Fixed { step, .. } = &mut chan.carr_phase {
            *step = (512.0 * 65536.0 * chan.f_carr * self.delt).round() as i32;
        }

        // Free-space amplitude, referenced to a 20200 km path.
        let path_loss = 20_200_000.0 / rho.d;
        let ant_gain = antenna_gain(rho.azel.el);

        path_loss * ant_gain * self.dac.gain
    }

    /// Fill `buf` with the channel sum, advancing every allocated
    /// channel's code, data and carrier state sample by sample.
    pub fn fill(&self, channels: &mut [Channel], gains: &[f64; MAX_CHAN], buf: &mut [IqSample]) {
        let delt = self.delt;

        for sample in buf.iter_mut() {
            let mut i_acc: i64 = 0;
            let mut q_acc: i64 = 0;

            for (chan, gain) in channels.iter_mut().zip(gains.iter()) {
                if !chan.is_allocated() {
                    continue;
                }

                let itable = match chan.carr_phase {
                    CarrierPhase::Float(phase) => (phase * 512.0) as usize,
                    CarrierPhase::Fixed { acc, .. } => ((acc >> 16) & 0x1FF) as usize,
                };
                let (cos, sin) = self.dac.iq(itable);

                let bc = f64::from(chan.data_bit * chan.code_chip);
                let ip = bc * f64::from(cos) * gain;
                let qp = bc * f64::from(sin) * gain;

                i_acc += ip as i64;
                q_acc += qp as i64;

                // Code phase advance, with chip/bit/word cursor updates on
                // each 1 ms code rollover.
                chan.code_phase += chan.f_code * delt;

                if chan.code_phase >= CA_SEQ_LEN as f64 {
                    chan.code_phase -= CA_SEQ_LEN as f64;

                    chan.icode += 1;
                    if chan.icode >= 20 {
                        // 20 C/A codes = 1 data bit
                        chan.icode = 0;
                        chan.ibit += 1;

                        if chan.ibit >= 30 {
                            // 30 data bits = 1 word
                            chan.ibit = 0;
                            chan.iword += 1;
                        }

                        chan.data_bit = (((chan.dwrd[chan.iword % N_DWRD]
                            >> (29 - chan.ibit))
                            & 0x1) as i32)
                            * 2
                            - 1;
                    }
                }

                chan.code_chip = i32::from(chan.ca[chan.code_phase as usize]) * 2 - 1;

                match &mut chan.carr_phase {
                    CarrierPhase::Float(phase) => {
                        *phase += chan.f_carr * delt;
                        if *phase >= 1.0 {
                            *phase -= 1.0;
                        } else if *phase < 0.0 {
                            *phase += 1.0;
                        }
                    }
                    CarrierPhase::Fixed { acc, step } => {
                        *acc = acc.wrapping_add(*step as u32);
                    }
                }
            }

            let i_out = (i_acc + self.dac.offset) >> self.dac.shift;
            let q_out = (q_acc + self.dac.offset) >> self.dac.shift;

            *sample = Complex::new(i_out as i16, q_out as i16);
        }
    }
}
