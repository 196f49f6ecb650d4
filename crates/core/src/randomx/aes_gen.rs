//! AES-based generators and the scratchpad fingerprint.
//!
//! Four independent 128-bit lanes; even lanes decrypt and odd lanes encrypt
//! (reversed for the hash). Every constant is a BLAKE2b digest of a fixed
//! label.

use crate::primitives::aes::{aesdec, aesenc};

/// BLAKE2b-512("RandomX AesGenerator1R keys")
#[rustfmt::skip]
const GEN_1R_KEYS: [[u8; 16]; 4] = [
    [0x53, 0xa5, 0xac, 0x6d, 0x09, 0x66, 0x71, 0x62,
     0x2b, 0x55, 0xb5, 0xdb, 0x17, 0x49, 0xf4, 0xb4],
    [0x07, 0xaf, 0x7c, 0x6d, 0x0d, 0x71, 0x6a, 0x84,
     0x78, 0xd3, 0x25, 0x17, 0x4e, 0xdc, 0xa1, 0x0d],
    [0xf1, 0x62, 0x12, 0x3f, 0xc6, 0x7e, 0x94, 0x9f,
     0x4f, 0x79, 0xc0, 0xf4, 0x45, 0xe3, 0x20, 0x3e],
    [0x35, 0x81, 0xef, 0x6a, 0x7c, 0x31, 0xba, 0xb1,
     0x88, 0x4c, 0x31, 0x16, 0x54, 0x91, 0x16, 0x49],
];

/// BLAKE2b-512 of "RandomX AesGenerator4R keys 0-3" and "... 4-7"
#[rustfmt::skip]
const GEN_4R_KEYS: [[u8; 16]; 8] = [
    [0xdd, 0xaa, 0x21, 0x64, 0xdb, 0x3d, 0x83, 0xd1,
     0x2b, 0x6d, 0x54, 0x2f, 0x3f, 0xd2, 0xe5, 0x99],
    [0x50, 0x34, 0x0e, 0xb2, 0x55, 0x3f, 0x91, 0xb6,
     0x53, 0x9d, 0xf7, 0x06, 0xe5, 0xcd, 0xdf, 0xa5],
    [0x04, 0xd9, 0x3e, 0x5c, 0xaf, 0x7b, 0x5e, 0x51,
     0x9f, 0x67, 0xa4, 0x0a, 0xbf, 0x02, 0x1c, 0x17],
    [0x63, 0x37, 0x62, 0x85, 0x08, 0x5d, 0x8f, 0xe7,
     0x85, 0x37, 0x67, 0xcd, 0x91, 0xd2, 0xde, 0xd8],
    [0x73, 0x6f, 0x82, 0xb5, 0xa6, 0xa7, 0xd6, 0xe3,
     0x6d, 0x8b, 0x51, 0x3d, 0xb4, 0xff, 0x9e, 0x22],
    [0xf3, 0x6b, 0x56, 0xc7, 0xd9, 0xb3, 0x10, 0x9c,
     0x4e, 0x4d, 0x02, 0xe9, 0xd2, 0xb7, 0x72, 0xb2],
    [0xe7, 0xc9, 0x73, 0xf2, 0x8b, 0xa3, 0x65, 0xf7,
     0x0a, 0x66, 0xa9, 0x2b, 0xa7, 0xef, 0x3b, 0xf6],
    [0x09, 0xd6, 0x7c, 0x7a, 0xde, 0x39, 0x58, 0x91,
     0xfd, 0xd1, 0x06, 0x0c, 0x2d, 0x76, 0xb0, 0xc0],
];

/// BLAKE2b-512("RandomX AesHash1R state")
#[rustfmt::skip]
const HASH_1R_STATE: [[u8; 16]; 4] = [
    [0x0d, 0x2c, 0xb5, 0x92, 0xde, 0x56, 0xa8, 0x9f,
     0x47, 0xdb, 0x82, 0xcc, 0xad, 0x3a, 0x98, 0xd7],
    [0x6e, 0x99, 0x8d, 0x33, 0x98, 0xb7, 0xc7, 0x15,
     0x5a, 0x12, 0x9e, 0xf5, 0x57, 0x80, 0xe7, 0xac],
    [0x17, 0x00, 0x77, 0x6a, 0xd0, 0xc7, 0x62, 0xae,
     0x6b, 0x50, 0x79, 0x50, 0xe4, 0x7c, 0xa0, 0xe8],
    [0x0c, 0x24, 0x0a, 0x63, 0x8d, 0x82, 0xad, 0x07,
     0x05, 0x00, 0xa1, 0x79, 0x48, 0x49, 0x99, 0x7e],
];

/// BLAKE2b-256("RandomX AesHash1R xkeys")
#[rustfmt::skip]
const HASH_1R_XKEYS: [[u8; 16]; 2] = [
    [0x89, 0x83, 0xfa, 0xf6, 0x9f, 0x94, 0x24, 0x8b,
     0xbf, 0x56, 0xdc, 0x90, 0x01, 0x02, 0x89, 0x06],
    [0xd1, 0x63, 0xb2, 0x61, 0x3c, 0xe0, 0xf4, 0x51,
     0xc6, 0x43, 0x10, 0xee, 0x9b, 0xf9, 0x18, 0xed],
];

type Lanes = [[u8; 16]; 4];

fn load_lanes(bytes: &[u8]) -> Lanes {
    let mut lanes = [[0u8; 16]; 4];
    for (lane, chunk) in lanes.iter_mut().zip(bytes.chunks_exact(16)) {
        lane.copy_from_slice(chunk);
    }
    lanes
}

fn store_lanes(lanes: &Lanes, out: &mut [u8]) {
    for (chunk, lane) in out.chunks_exact_mut(16).zip(lanes) {
        chunk.copy_from_slice(lane);
    }
}

/// AesGenerator1R: one round per lane per 64 output bytes. `state` is
/// advanced in place so the caller can seed the next stage from it.
pub(crate) fn fill_1r(state: &mut [u8; 64], out: &mut [u8]) {
    let mut s = load_lanes(&state[..]);
    for block in out.chunks_exact_mut(64) {
        s[0] = aesdec(&s[0], &GEN_1R_KEYS[0]);
        s[1] = aesenc(&s[1], &GEN_1R_KEYS[1]);
        s[2] = aesdec(&s[2], &GEN_1R_KEYS[2]);
        s[3] = aesenc(&s[3], &GEN_1R_KEYS[3]);
        store_lanes(&s, block);
    }
    store_lanes(&s, state);
}

/// AesGenerator4R: four rounds per lane; lanes 0-1 use keys 0-3 and lanes
/// 2-3 use keys 4-7. The seed is left untouched.
pub(crate) fn fill_4r(state: &[u8; 64], out: &mut [u8]) {
    let mut s = load_lanes(&state[..]);
    for block in out.chunks_exact_mut(64) {
        for round in 0..4 {
            let lo = &GEN_4R_KEYS[round];
            let hi = &GEN_4R_KEYS[round + 4];
            s[0] = aesdec(&s[0], lo);
            s[1] = aesenc(&s[1], lo);
            s[2] = aesdec(&s[2], hi);
            s[3] = aesenc(&s[3], hi);
        }
        store_lanes(&s, block);
    }
}

/// AesHash1R over a buffer whose length is a multiple of 64.
pub(crate) fn hash_1r(input: &[u8]) -> [u8; 64] {
    let mut s = HASH_1R_STATE;
    for block in input.chunks_exact(64) {
        let b = load_lanes(block);
        s[0] = aesenc(&s[0], &b[0]);
        s[1] = aesdec(&s[1], &b[1]);
        s[2] = aesenc(&s[2], &b[2]);
        s[3] = aesdec(&s[3], &b[3]);
    }
    for key in &HASH_1R_XKEYS {
        s[0] = aesenc(&s[0], key);
        s[1] = aesdec(&s[1], key);
        s[2] = aesenc(&s[2], key);
        s[3] = aesdec(&s[3], key);
    }
    let mut out = [0u8; 64];
    store_lanes(&s, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blake2::digest::consts::U32;
    use blake2::{Blake2b, Blake2b512, Digest};

    fn flat<const N: usize>(keys: &[[u8; 16]; N]) -> Vec<u8> {
        keys.iter().flatten().copied().collect()
    }

    #[test]
    fn test_constants_are_label_digests() {
        assert_eq!(
            flat(&GEN_1R_KEYS),
            Blake2b512::digest(b"RandomX AesGenerator1R keys").to_vec()
        );
        let mut four = Blake2b512::digest(b"RandomX AesGenerator4R keys 0-3").to_vec();
        four.extend_from_slice(&Blake2b512::digest(b"RandomX AesGenerator4R keys 4-7"));
        assert_eq!(flat(&GEN_4R_KEYS), four);
        assert_eq!(
            flat(&HASH_1R_STATE),
            Blake2b512::digest(b"RandomX AesHash1R state").to_vec()
        );
        assert_eq!(
            flat(&HASH_1R_XKEYS),
            Blake2b::<U32>::digest(b"RandomX AesHash1R xkeys").to_vec()
        );
    }

    #[test]
    fn test_generator_1r_state() {
        let mut state = [0u8; 64];
        state[..32].copy_from_slice(
            &hex::decode("6c19536eb2de31b6c0065f7f116e86f960d8af0c57210a6584c3237b9d064dc7")
                .unwrap(),
        );
        let mut out = [0u8; 64];
        fill_1r(&mut state, &mut out);
        assert_eq!(
            hex::encode(&state[..32]),
            "fa89397dd6ca422513aeadba3f124b5540324c4ad4b6db434394307a17c833ab"
        );
        assert_eq!(&out[..], &state[..]);
    }

    #[test]
    fn test_generator_4r_leaves_seed() {
        let seed = [7u8; 64];
        let mut a = [0u8; 128];
        let mut b = [0u8; 64];
        fill_4r(&seed, &mut a);
        fill_4r(&seed, &mut b);
        assert_eq!(&a[..64], &b[..]);
        assert_ne!(&a[..64], &a[64..]);
    }
}
