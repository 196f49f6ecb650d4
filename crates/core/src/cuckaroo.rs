//! Cuckaroo-29 cycle hashes.
//!
//! A solved ring is a list of edge indices. Each edge contributes its low
//! 29 bits, packed least-significant bit first into a contiguous buffer;
//! the digest is BLAKE2b-256 of that buffer in reversed byte order.

use crate::codec::reversed;
use crate::error::{Error, Result};
use crate::randomx::blake2b256;

/// Bits stored per edge.
pub const EDGE_BITS: usize = 29;

/// Cycle length flavour; each fixes the number of edges in a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleVariant {
    C29,
    C29b,
    C29i,
}

impl CycleVariant {
    pub fn proof_size(self) -> usize {
        match self {
            Self::C29 => 32,
            Self::C29b => 40,
            Self::C29i => 48,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C29 => "c29",
            Self::C29b => "c29b",
            Self::C29i => "c29i",
        }
    }
}

fn pack_edges(ring: &[u32]) -> Vec<u8> {
    let mut packed = vec![0u8; ring.len() * EDGE_BITS / 8];
    let mut bit = 0;
    for &edge in ring {
        for j in 0..EDGE_BITS {
            if (edge >> j) & 1 == 1 {
                packed[bit / 8] |= 1 << (bit % 8);
            }
            bit += 1;
        }
    }
    packed
}

/// Digest of a ring; bits above the 29th of every edge are ignored.
pub fn cycle_hash(ring: &[u32], variant: CycleVariant) -> Result<[u8; 32]> {
    if ring.len() != variant.proof_size() {
        return Err(Error::length("cycle ring", variant.proof_size(), ring.len()));
    }
    Ok(reversed(blake2b256(&pack_edges(ring))))
}
