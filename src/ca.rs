//! C/A spreading-code generation.
//!
//! The classic two-LFSR Gold code construction: G2 is delayed per PRN by a
//! fixed chip count rather than tapped, which yields the same family.

use crate::constants::CA_SEQ_LEN;

/// G2 delay in chips for PRN 1..=32.
const DELAY: [usize; 32] = [
    5, 6, 7, 8, 17, 18, 139, 140, 141, 251, //
    252, 254, 255, 256, 257, 258, 469, 470, 471, 472, //
    473, 474, 509, 512, 513, 514, 515, 516, 859, 860, //
    861, 862,
];

/// Generate the 1023-chip C/A sequence for `prn` as 0/1 chips.
pub fn generate_code(prn: u8) -> [u8; CA_SEQ_LEN] {
    assert!((1..=32).contains(&prn), "PRN out of range: {prn}");

    let mut g1 = [0i8; CA_SEQ_LEN];
    let mut g2 = [0i8; CA_SEQ_LEN];
    let mut r1 = [-1i8; 10];
    let mut r2 = [-1i8; 10];

    for i in 0..CA_SEQ_LEN {
        g1[i] = r1[9];
        g2[i] = r2[9];
        let c1 = r1[2] * r1[9];
        let c2 = r2[1] * r2[2] * r2[5] * r2[7] * r2[8] * r2[9];

        for j in (1..10).rev() {
            r1[j] = r1[j - 1];
            r2[j] = r2[j - 1];
        }
        r1[0] = c1;
        r2[0] = c2;
    }

    let mut ca = [0u8; CA_SEQ_LEN];
    let mut j = CA_SEQ_LEN - DELAY[(prn - 1) as usize];
    for (i, chip) in ca.iter_mut().enumerate() {
        *chip = ((1 - g1[i] * g2[j % CA_SEQ_LEN]) / 2) as u8;
        j += 1;
    }

    ca
}
