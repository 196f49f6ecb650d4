//! Keccak digests and the raw sponge state.
//!
//! Ethash, KawPow and CryptoNight all use the original Keccak padding
//! (`0x01 .. 0x80`) rather than the FIPS-202 SHA-3 domain byte. The
//! digests come from `sha3`; CryptoNight needs the whole 200-byte state,
//! so the sponge is also driven by hand over the `keccak` permutation.

use sha3::{Digest, Keccak256, Keccak512, Sha3_256};

/// Sponge rate in bytes for a 256-bit digest.
pub const RATE_256: usize = 136;
/// Sponge rate in bytes for a 512-bit digest.
pub const RATE_512: usize = 72;

#[inline(always)]
pub fn keccakf1600(state: &mut [u64; 25]) {
    keccak::f1600(state);
}

#[inline(always)]
pub fn keccakf800(state: &mut [u32; 25]) {
    keccak::f800(state);
}

fn xor_block(state: &mut [u64; 25], block: &[u8]) {
    for (lane, chunk) in state.iter_mut().zip(block.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *lane ^= u64::from_le_bytes(word);
    }
}

/// Absorb `data` with Keccak padding and return the permuted state.
pub fn absorb(data: &[u8], rate: usize) -> [u64; 25] {
    let mut state = [0u64; 25];
    let mut blocks = data.chunks_exact(rate);
    for block in &mut blocks {
        xor_block(&mut state, block);
        keccakf1600(&mut state);
    }

    let tail = blocks.remainder();
    let mut last = [0u8; 200];
    last[..tail.len()].copy_from_slice(tail);
    last[tail.len()] ^= 0x01;
    last[rate - 1] ^= 0x80;
    xor_block(&mut state, &last[..rate]);
    keccakf1600(&mut state);
    state
}

/// Read `out.len()` bytes from the front of the state (at most one rate).
pub fn squeeze(state: &[u64; 25], out: &mut [u8]) {
    for (chunk, lane) in out.chunks_mut(8).zip(state.iter()) {
        chunk.copy_from_slice(&lane.to_le_bytes()[..chunk.len()]);
    }
}

pub fn state_bytes(state: &[u64; 25]) -> [u8; 200] {
    let mut out = [0u8; 200];
    squeeze(state, &mut out);
    out
}

pub fn state_from_bytes(bytes: &[u8; 200]) -> [u64; 25] {
    let mut state = [0u64; 25];
    xor_block(&mut state, bytes);
    state
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

pub fn keccak512(data: &[u8]) -> [u8; 64] {
    Keccak512::digest(data).into()
}

/// Full 200-byte Keccak state after absorbing `data` at the 256-bit rate.
/// This is the CryptoNight initial state.
pub fn keccak_state(data: &[u8]) -> [u8; 200] {
    state_bytes(&absorb(data, RATE_256))
}

/// FIPS-202 SHA3-256 (AstroBWT).
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    Sha3_256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sponge_matches_keccak256() {
        for len in [0usize, 1, 32, 135, 136, 137, 300] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let state = keccak_state(&data);
            assert_eq!(&state[..32], &keccak256(&data)[..], "len {len}");
        }
    }

    #[test]
    fn test_sponge_matches_keccak512() {
        for len in [0usize, 40, 71, 72, 73, 200] {
            let data: Vec<u8> = (0..len).map(|i| (i * 13 + 5) as u8).collect();
            let mut out = [0u8; 64];
            squeeze(&absorb(&data, RATE_512), &mut out);
            assert_eq!(out, keccak512(&data), "len {len}");
        }
    }

    #[test]
    fn test_empty_keccak_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak512(b"")),
            "0eab42de4c3ceb9235fc91acffe746b29c29a8c366b7c60e4e67c466f36a4304\
             c00fa9caf9d87976ba469bcbe06713b435f091ef2769fb160cdab33d3670680e"
        );
    }

    #[test]
    fn test_state_round_trip() {
        let state = keccak_state(b"cryptonight state");
        let round_trip = state_bytes(&state_from_bytes(&state));
        assert_eq!(round_trip, state);
    }
}
