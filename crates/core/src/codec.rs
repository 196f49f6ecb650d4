//! Fixed-endianness helpers and arena allocation.
//!
//! Every engine reads and writes little-endian words out of byte buffers;
//! these helpers keep the slicing in one place.

use crate::error::{Error, Result};

#[inline(always)]
pub fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

#[inline(always)]
pub fn read_u64_le(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

#[inline(always)]
pub fn write_u64_le(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Copy a slice into a fixed array, rejecting any other width.
pub fn to_array<const N: usize>(what: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::length(what, N, bytes.len()))
}

/// Reverse a 32-byte digest (display order used by several chains).
pub fn reversed(digest: [u8; 32]) -> [u8; 32] {
    let mut out = digest;
    out.reverse();
    out
}

/// Allocate a zeroed arena of `len` items, reporting allocation failure
/// instead of aborting.
pub fn alloc_arena<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut arena = Vec::new();
    arena.try_reserve_exact(len).map_err(|_| {
        tracing::warn!(items = len, "arena allocation failed");
        Error::ResourceExhaustion {
            bytes: len.saturating_mul(core::mem::size_of::<T>()),
        }
    })?;
    arena.resize(len, T::default());
    Ok(arena)
}

/// Little-endian `u32` words of a byte slice whose length is a multiple of 4.
pub fn words_u32(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}
