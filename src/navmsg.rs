//! Navigation-message assembly: subframe packing and word parity.
//!
//! Words are carried in the low 30 bits of a `u32`. Before parity is
//! computed, bits 31:30 hold D29*/D30*, the two trailing bits of the
//! previously transmitted word.

use std::f64::consts::PI;

use crate::constants::{N_DWRD_SBF, N_SBF};
use crate::ephemeris::{Ephemeris, IonoUtc};

/// The five raw subframes of one satellite, prior to TOW/WN insertion
/// and parity.
pub type Subframes = [[u32; N_DWRD_SBF]; N_SBF];

const POW2_M5: f64 = 0.03125;
const POW2_M19: f64 = 1.907_348_632_812_5e-6;
const POW2_M24: f64 = 5.960_464_477_539_063e-8;
const POW2_M27: f64 = 7.450_580_596_923_828e-9;
const POW2_M29: f64 = 1.862_645_149_230_957e-9;
const POW2_M30: f64 = 9.313_225_746_154_785e-10;
const POW2_M31: f64 = 4.656_612_873_077_393e-10;
const POW2_M33: f64 = 1.164_153_218_269_348e-10;
const POW2_M43: f64 = 1.136_868_377_216_160e-13;
const POW2_M50: f64 = 8.881_784_197_001_252e-16;
const POW2_M55: f64 = 2.775_557_561_562_891e-17;

/// The six parity equations of the 24-bit data word, as masks over the
/// D29*/D30*-prefixed layout.
const PARITY_MASK: [u32; 6] = [
    0x3B1F_3480,
    0x1D8F_9A40,
    0x2EC7_CD00,
    0x1763_E680,
    0x2BB1_F340,
    0x0B7A_89C0,
];

/// Compute the six parity bits of a 30-bit word.
///
/// `source` carries D29*/D30* in bits 31:30, the 24 data bits in 29:6.
/// When `nib` is set (words 2 and 10), bits 23 and 24 of the data are
/// pre-solved so that the two trailing parity bits come out zero.
pub fn compute_checksum(source: u32, nib: bool) -> u32 {
    let mut d = source & 0x3FFF_FFC0;
    let d29 = (source >> 31) & 0x1;
    let d30 = (source >> 30) & 0x1;

    if nib {
        // Non-information-bearing bits solve the last two equations.
        if (d30 + (PARITY_MASK[4] & d).count_ones()) % 2 != 0 {
            d ^= 0x1 << 6;
        }
        if (d29 + (PARITY_MASK[5] & d).count_ones()) % 2 != 0 {
            d ^= 0x1 << 7;
        }
    }

    let mut word = d;
    if d30 != 0 {
        word ^= 0x3FFF_FFC0;
    }

    word |= ((d29 + (PARITY_MASK[0] & d).count_ones()) % 2) << 5;
    word |= ((d30 + (PARITY_MASK[1] & d).count_ones()) % 2) << 4;
    word |= ((d29 + (PARITY_MASK[2] & d).count_ones()) % 2) << 3;
    word |= ((d30 + (PARITY_MASK[3] & d).count_ones()) % 2) << 2;
    word |= ((d30 + (PARITY_MASK[4] & d).count_ones()) % 2) << 1;
    word |= (d29 + (PARITY_MASK[5] & d).count_ones()) % 2;

    word & 0x3FFF_FFFF
}

/// Pack an ephemeris (and iono/UTC page when valid) into the five-subframe
/// source-word image.
///
/// The transmission week field of subframe 1 is left zero here; the word
/// count and week are ORed in when the message stream is generated.
// TODO: carry the true transmission week. A receiver that aligns its
// almanac week to subframe 1 will mis-decode the epoch with WN = 0.
pub fn eph_to_subframes(eph: &Ephemeris, ionoutc: &IonoUtc) -> Subframes {
    let mut sbf: Subframes = [[0u32; N_DWRD_SBF]; N_SBF];

    let wn = 0u32;
    let ura = 0u32;
    let data_id = 1u32;
    let sbf4_page25_sv_id = 63u32;
    let sbf5_page25_sv_id = 51u32;
    let sbf4_page18_sv_id = 56u32;

    let toe = (eph.toe.sec / 16.0) as u32;
    let toc = (eph.toc.sec / 16.0) as u32;
    let iode = eph.iode as u32;
    let iodc = eph.iodc as u32;
    let deltan = (eph.deltan / POW2_M43 / PI) as i64;
    let cuc = (eph.cuc / POW2_M29) as i64;
    let cus = (eph.cus / POW2_M29) as i64;
    let cic = (eph.cic / POW2_M29) as i64;
    let cis = (eph.cis / POW2_M29) as i64;
    let crc = (eph.crc / POW2_M5) as i64;
    let crs = (eph.crs / POW2_M5) as i64;
    let ecc = (eph.ecc / POW2_M33) as u64;
    let sqrta = (eph.sqrta / POW2_M19) as u64;
    let m0 = (eph.m0 / POW2_M31 / PI) as i64;
    let omg0 = (eph.omg0 / POW2_M31 / PI) as i64;
    let inc0 = (eph.inc0 / POW2_M31 / PI) as i64;
    let aop = (eph.aop / POW2_M31 / PI) as i64;
    let omgdot = (eph.omgdot / POW2_M43 / PI) as i64;
    let idot = (eph.idot / POW2_M43 / PI) as i64;
    let af0 = (eph.af0 / POW2_M31) as i64;
    let af1 = (eph.af1 / POW2_M43) as i64;
    let af2 = (eph.af2 / POW2_M55) as i64;
    let tgd = (eph.tgd / POW2_M31) as i64;
    let svhlth = eph.svhlth as u32;
    let code_l2 = eph.code_l2 as u32;

    let wna = (eph.toe.week % 256) as u32;
    let toa = (eph.toe.sec / 4096.0) as u32;

    // Subframe 1.
    sbf[0][0] = 0x8B_0000 << 6;
    sbf[0][1] = 0x1 << 8;
    sbf[0][2] = ((wn & 0x3FF) << 20)
        | ((code_l2 & 0x3) << 18)
        | ((ura & 0xF) << 14)
        | ((svhlth & 0x3F) << 8)
        | (((iodc >> 8) & 0x3) << 6);
    sbf[0][3] = 0;
    sbf[0][4] = 0;
    sbf[0][5] = 0;
    sbf[0][6] = ((tgd & 0xFF) as u32) << 6;
    sbf[0][7] = ((iodc & 0xFF) << 22) | ((toc & 0xFFFF) << 6);
    sbf[0][8] = (((af2 & 0xFF) as u32) << 22) | (((af1 & 0xFFFF) as u32) << 6);
    sbf[0][9] = ((af0 & 0x3F_FFFF) as u32) << 8;

    // Subframe 2.
    sbf[1][0] = 0x8B_0000 << 6;
    sbf[1][1] = 0x2 << 8;
    sbf[1][2] = ((iode & 0xFF) << 22) | (((crs & 0xFFFF) as u32) << 6);
    sbf[1][3] = (((deltan & 0xFFFF) as u32) << 14) | ((((m0 >> 24) & 0xFF) as u32) << 6);
    sbf[1][4] = ((m0 & 0xFF_FFFF) as u32) << 6;
    sbf[1][5] = (((cuc & 0xFFFF) as u32) << 14) | ((((ecc >> 24) & 0xFF) as u32) << 6);
    sbf[1][6] = ((ecc & 0xFF_FFFF) as u32) << 6;
    sbf[1][7] = (((cus & 0xFFFF) as u32) << 14) | ((((sqrta >> 24) & 0xFF) as u32) << 6);
    sbf[1][8] = ((sqrta & 0xFF_FFFF) as u32) << 6;
    sbf[1][9] = (toe & 0xFFFF) << 14;

    // Subframe 3.
    sbf[2][0] = 0x8B_0000 << 6;
    sbf[2][1] = 0x3 << 8;
    sbf[2][2] = (((cic & 0xFFFF) as u32) << 14) | ((((omg0 >> 24) & 0xFF) as u32) << 6);
    sbf[2][3] = ((omg0 & 0xFF_FFFF) as u32) << 6;
    sbf[2][4] = (((cis & 0xFFFF) as u32) << 14) | ((((inc0 >> 24) & 0xFF) as u32) << 6);
    sbf[2][5] = ((inc0 & 0xFF_FFFF) as u32) << 6;
    sbf[2][6] = (((crc & 0xFFFF) as u32) << 14) | ((((aop >> 24) & 0xFF) as u32) << 6);
    sbf[2][7] = ((aop & 0xFF_FFFF) as u32) << 6;
    sbf[2][8] = ((omgdot & 0xFF_FFFF) as u32) << 6;
    sbf[2][9] = ((iode & 0xFF) << 22) | (((idot & 0x3FFF) as u32) << 8);

    if ionoutc.valid {
        let alpha0 = (ionoutc.alpha0 / POW2_M30).round() as i64;
        let alpha1 = (ionoutc.alpha1 / POW2_M27).round() as i64;
        let alpha2 = (ionoutc.alpha2 / POW2_M24).round() as i64;
        let alpha3 = (ionoutc.alpha3 / POW2_M24).round() as i64;
        let beta0 = (ionoutc.beta0 / 2048.0).round() as i64;
        let beta1 = (ionoutc.beta1 / 16384.0).round() as i64;
        let beta2 = (ionoutc.beta2 / 65536.0).round() as i64;
        let beta3 = (ionoutc.beta3 / 65536.0).round() as i64;
        let a0 = (ionoutc.a0 / POW2_M30).round() as i64;
        let a1 = (ionoutc.a1 / POW2_M50).round() as i64;
        let dtls = i64::from(ionoutc.dtls);
        let tot = (ionoutc.tot / 4096) as u32;
        let wnt = (ionoutc.wnt % 256) as u32;
        // Scheduled leap-second framing: 2016-12-31 event.
        let wnlsf = (1929 % 256) as u32;
        let dn = 7u32;
        let dtlsf = 18u32;

        // Subframe 4, page 18.
        sbf[3][0] = 0x8B_0000 << 6;
        sbf[3][1] = 0x4 << 8;
        sbf[3][2] = (data_id << 28)
            | (sbf4_page18_sv_id << 22)
            | (((alpha0 & 0xFF) as u32) << 14)
            | (((alpha1 & 0xFF) as u32) << 6);
        sbf[3][3] = (((alpha2 & 0xFF) as u32) << 22)
            | (((alpha3 & 0xFF) as u32) << 14)
            | (((beta0 & 0xFF) as u32) << 6);
        sbf[3][4] = (((beta1 & 0xFF) as u32) << 22)
            | (((beta2 & 0xFF) as u32) << 14)
            | (((beta3 & 0xFF) as u32) << 6);
        sbf[3][5] = ((a1 & 0xFF_FFFF) as u32) << 6;
        sbf[3][6] = (((a0 >> 8) & 0xFF_FFFF) as u32) << 6;
        sbf[3][7] = (((a0 & 0xFF) as u32) << 22) | ((tot & 0xFF) << 14) | ((wnt & 0xFF) << 6);
        sbf[3][8] = (((dtls & 0xFF) as u32) << 22) | ((wnlsf & 0xFF) << 14) | ((dn & 0xFF) << 6);
        sbf[3][9] = (dtlsf & 0xFF) << 22;
    } else {
        // Subframe 4, page 25.
        sbf[3][0] = 0x8B_0000 << 6;
        sbf[3][1] = 0x4 << 8;
        sbf[3][2] = (data_id << 28) | (sbf4_page25_sv_id << 22);
    }

    // Subframe 5, page 25.
    sbf[4][0] = 0x8B_0000 << 6;
    sbf[4][1] = 0x5 << 8;
    sbf[4][2] = (data_id << 28) | (sbf5_page25_sv_id << 22) | ((toa & 0xFF) << 14) | ((wna & 0xFF) << 6);

    sbf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Re-derive one parity equation directly from the mask definition.
    fn parity_bit(prev: u32, data: u32, mask: u32) -> u32 {
        (prev + (mask & data).count_ones()) % 2
    }

    #[test]
    fn fixed_vector() {
        // TLM preamble word with the two trailing data bits set; checked
        // against the six parity equations evaluated by hand.
        assert_eq!(compute_checksum(0x22C0_00C0, false), 0x22C0_00E4);
    }

    #[test]
    fn parity_equations_hold_for_random_words() {
        let mut rng = StdRng::seed_from_u64(0x1CA0);
        for _ in 0..2000 {
            let payload: u32 = rng.gen_range(0..1 << 24);
            let d29s: u32 = rng.gen_range(0..2);
            let d30s: u32 = rng.gen_range(0..2);
            let source = (d29s << 31) | (d30s << 30) | (payload << 6);

            let word = compute_checksum(source, false);

            // Recover the data bits as transmitted (complemented by D30*).
            let d = if d30s != 0 {
                (source & 0x3FFF_FFC0) ^ 0x3FFF_FFC0
            } else {
                source & 0x3FFF_FFC0
            };
            assert_eq!(word & 0x3FFF_FFC0, d);

            // The six parity bits are computed over the raw data bits.
            let raw = source & 0x3FFF_FFC0;
            let expect = (parity_bit(d29s, raw, PARITY_MASK[0]) << 5)
                | (parity_bit(d30s, raw, PARITY_MASK[1]) << 4)
                | (parity_bit(d29s, raw, PARITY_MASK[2]) << 3)
                | (parity_bit(d30s, raw, PARITY_MASK[3]) << 2)
                | (parity_bit(d30s, raw, PARITY_MASK[4]) << 1)
                | parity_bit(d29s, raw, PARITY_MASK[5]);
            assert_eq!(word & 0x3F, expect);
        }
    }

    #[test]
    fn nib_words_end_in_zero_parity() {
        let mut rng = StdRng::seed_from_u64(0x1CA1);
        for _ in 0..2000 {
            // Bits 23/24 of the payload are non-information-bearing.
            let payload: u32 = rng.gen_range(0..1 << 24) & !0x3;
            let d29s: u32 = rng.gen_range(0..2);
            let d30s: u32 = rng.gen_range(0..2);
            let source = (d29s << 31) | (d30s << 30) | (payload << 6);

            let word = compute_checksum(source, true);
            assert_eq!(word & 0x3, 0, "source {source:#010x} -> {word:#010x}");
        }
    }

    #[test]
    fn subframe_ids_in_how_word() {
        let eph = crate::test_utilities::nominal_ephemeris(0.0, 0.0);
        let ionoutc = IonoUtc::default();
        let sbf = eph_to_subframes(&eph, &ionoutc);
        for (i, frame) in sbf.iter().enumerate() {
            assert_eq!(frame[0], 0x8B_0000 << 6, "TLM preamble, subframe {}", i + 1);
            assert_eq!((frame[1] >> 8) & 0x7, (i + 1) as u32, "subframe id");
        }
        // Page 25 fill when iono/UTC are absent.
        assert_eq!((sbf[3][2] >> 22) & 0x3F, 63);
        assert_eq!((sbf[4][2] >> 22) & 0x3F, 51);
    }

    #[test]
    fn subframe1_carries_clock_terms() {
        let mut eph = crate::test_utilities::nominal_ephemeris(0.0, 0.0);
        eph.iodc = 0x155;
        eph.af0 = 21.0 * POW2_M31;
        eph.af1 = -3.0 * POW2_M43;
        let sbf = eph_to_subframes(&eph, &IonoUtc::default());

        assert_eq!((sbf[0][7] >> 22) & 0xFF, 0x55);
        assert_eq!((sbf[0][2] >> 6) & 0x3, 0x1); // IODC MSBs
        assert_eq!((sbf[0][9] >> 8) & 0x3F_FFFF, 21);
        // af1 is negative: stored two's complement in 16 bits.
        assert_eq!((sbf[0][8] >> 6) & 0xFFFF, 0xFFFD);
    }

    #[test]
    fn subframe4_page18_when_iono_valid() {
        let eph = crate::test_utilities::nominal_ephemeris(0.0, 0.0);
        let ionoutc = IonoUtc {
            valid: true,
            alpha0: 4.0 * POW2_M30,
            beta0: 2048.0 * 3.0,
            dtls: 18,
            tot: 503808,
            wnt: 1824,
            ..Default::default()
        };
        let sbf = eph_to_subframes(&eph, &ionoutc);
        assert_eq!((sbf[3][2] >> 22) & 0x3F, 56); // page 18 SV id
        assert_eq!((sbf[3][2] >> 14) & 0xFF, 4); // alpha0
        assert_eq!((sbf[3][3] >> 6) & 0xFF, 3); // beta0
        assert_eq!((sbf[3][8] >> 22) & 0xFF, 18); // delta-t LS
        assert_eq!((sbf[3][7] >> 6) & 0xFF, (1824 % 256) as u32);
    }
}
