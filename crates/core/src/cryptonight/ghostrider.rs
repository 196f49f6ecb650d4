//! Ghostrider: fifteen chained 512-bit hashes interleaved with three
//! CryptoNight steps, in an order picked from the previous block hash.
//!
//! The chain runs as three parts of five core hashes followed by one
//! scratchpad step. The order of both lists comes from the nibbles of
//! header bytes 4..36.

use super::{CnVariant, CryptoNight};
use crate::error::{Error, Result};
use crate::primitives::{
    blake512, bmw512, cubehash512, echo512, groestl512, jh512, keccak512, luffa512, shabal512,
    shavite512, simd512, skein512_512, whirlpool512,
};

const CORE_PER_PART: usize = 5;
const PARTS: usize = 3;

/// Header bytes holding the previous block hash that seeds the order.
const SEED_RANGE: core::ops::Range<usize> = 4..36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreHash {
    Blake,
    Bmw,
    Groestl,
    Jh,
    Keccak,
    Skein,
    Luffa,
    Cubehash,
    Shavite,
    Simd,
    Echo,
    Hamsi,
    Fugue,
    Shabal,
    Whirlpool,
}

impl CoreHash {
    pub const ALL: [CoreHash; 15] = [
        Self::Blake,
        Self::Bmw,
        Self::Groestl,
        Self::Jh,
        Self::Keccak,
        Self::Skein,
        Self::Luffa,
        Self::Cubehash,
        Self::Shavite,
        Self::Simd,
        Self::Echo,
        Self::Hamsi,
        Self::Fugue,
        Self::Shabal,
        Self::Whirlpool,
    ];

    /// Built-in implementation, if this crate carries one.
    pub fn builtin(self) -> Option<fn(&[u8]) -> [u8; 64]> {
        match self {
            Self::Blake => Some(blake512),
            Self::Bmw => Some(bmw512),
            Self::Groestl => Some(groestl512),
            Self::Jh => Some(jh512),
            Self::Keccak => Some(keccak512),
            Self::Skein => Some(skein512_512),
            Self::Luffa => Some(luffa512),
            Self::Cubehash => Some(cubehash512),
            Self::Shavite => Some(shavite512),
            Self::Simd => Some(simd512),
            Self::Echo => Some(echo512),
            Self::Shabal => Some(shabal512),
            Self::Whirlpool => Some(whirlpool512),
            // TODO: Hamsi-512 and Fugue-512 need a verified implementation.
            Self::Hamsi | Self::Fugue => None,
        }
    }

    fn index(self) -> u64 {
        self as u64
    }
}

/// Position in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Core { round: usize },
    Scratchpad { part: usize },
    Done,
}

impl Stage {
    fn next(self) -> Self {
        match self {
            Stage::Core { round } if (round + 1) % CORE_PER_PART == 0 => {
                Stage::Scratchpad {
                    part: round / CORE_PER_PART,
                }
            }
            Stage::Core { round } => Stage::Core { round: round + 1 },
            Stage::Scratchpad { part } if part + 1 == PARTS => Stage::Done,
            Stage::Scratchpad { part } => Stage::Core {
                round: (part + 1) * CORE_PER_PART,
            },
            Stage::Done => Stage::Done,
        }
    }
}

/// Permutation of `0..N`: distinct nibble values (mod N) in order of first
/// appearance, low nibble of each byte first, then the values never seen.
fn select_indices<const N: usize>(seed: &[u8]) -> [usize; N] {
    let mut out = [0usize; N];
    let mut selected = [false; N];
    let mut k = 0;

    let nibbles = seed.iter().flat_map(|&b| [b & 0xf, b >> 4]);
    for nibble in nibbles {
        let index = nibble as usize % N;
        if !selected[index] {
            selected[index] = true;
            out[k] = index;
            k += 1;
            if k == N {
                return out;
            }
        }
    }

    for (index, seen) in selected.iter().enumerate() {
        if !seen {
            out[k] = index;
            k += 1;
        }
    }
    out
}

/// Ghostrider over the built-in core hashes.
///
/// Every chain uses all fifteen core hashes, so a missing implementation
/// is reported before any hashing starts.
pub fn ghostrider(header: &[u8]) -> Result<[u8; 32]> {
    if let Some(missing) = CoreHash::ALL.iter().find(|h| h.builtin().is_none()) {
        return Err(Error::variant("ghostrider core hash", missing.index()));
    }
    ghostrider_with(header, |hash, data| match hash.builtin() {
        Some(f) => Ok(f(data)),
        None => Err(Error::variant("ghostrider core hash", hash.index())),
    })
}

/// Ghostrider with a caller-supplied core hash table.
pub fn ghostrider_with<F>(header: &[u8], core: F) -> Result<[u8; 32]>
where
    F: Fn(CoreHash, &[u8]) -> Result<[u8; 64]>,
{
    if header.len() < SEED_RANGE.end {
        return Err(Error::length("ghostrider header", SEED_RANGE.end, header.len()));
    }
    let seed = &header[SEED_RANGE];
    let core_order: [usize; 15] = select_indices(seed);
    let cn_order: [usize; 6] = select_indices(seed);
    tracing::debug!(?core_order, ?cn_order, "ghostrider order");

    let capacity = cn_order[..PARTS]
        .iter()
        .map(|&i| CnVariant::GHOSTRIDER[i].memory())
        .max()
        .unwrap_or(0);
    let mut scratchpad = CryptoNight::with_capacity(capacity)?;

    let mut data = header.to_vec();
    let mut stage = Stage::Core { round: 0 };
    loop {
        match stage {
            Stage::Core { round } => {
                data = core(CoreHash::ALL[core_order[round]], &data)?.to_vec();
            }
            Stage::Scratchpad { part } => {
                let variant = CnVariant::GHOSTRIDER[cn_order[part]];
                data = scratchpad.hash(&data, variant, 0)?.to_vec();
            }
            Stage::Done => break,
        }
        stage = stage.next();
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&data);
    Ok(out)
}
