//! # multipow core
//!
//! Proof-of-work hash cores for mining and validation clients. Every
//! algorithm is a pure function `digest = hash(algorithm, inputs...)`;
//! the memory-hard ones build a per-epoch cache (and optionally a full
//! dataset) that is shared read-only across concurrent hashes.
//!
//! ## Algorithms
//!
//! - **CryptoNight** family (classic, light, heavy, pico) and the
//!   **Ghostrider** chain
//! - **RandomX** (RandomX, RandomARQ, RandomKEVA)
//! - **Ethash** and **Etchash**, light or full dataset
//! - **KawPow** (ProgPoW 0.9.4 over the Ethash dataset)
//! - **AstroBWT** (DERO v1 and v2)
//! - **Argon2id** family (Chukwa, WRKZ, Chukwa v2)
//! - Keccak-256 / SHA3-256 and KangarooTwelve
//! - Cuckaroo-29 cycle hashes (c29, c29b, c29i)
//!
//! ## Example
//!
//! ```rust
//! use multipow_core::{Algorithm, Engine};
//!
//! let engine = Engine::new();
//! let digest = engine.hash(&Algorithm::Keccak256 { input: b"" }).unwrap();
//! assert_eq!(digest[0], 0xc5);
//! ```
//!
//! Epoch state lives inside the [`Engine`]; dropping it or calling
//! [`Engine::invalidate_all`] releases every cache.

mod codec;
mod epoch_cache;
mod error;
mod params;

pub mod algorithm;
pub mod astrobwt;
pub mod chukwa;
pub mod cryptonight;
pub mod cuckaroo;
pub mod ethash;
pub mod kawpow;
pub mod primitives;
pub mod randomx;

pub use algorithm::{Algorithm, CryptoNightFamily, Engine, EngineConfig, EthashEpoch};
pub use astrobwt::{AstroBwtVariant, astrobwt};
pub use chukwa::{Argon2Hasher, Argon2Variant, argon2};
pub use codec::reversed;
pub use cryptonight::{CnVariant, CryptoNight, cryptonight, ghostrider};
pub use cuckaroo::{CycleVariant, cycle_hash};
pub use epoch_cache::EpochCache;
pub use error::{Error, Result};
pub use ethash::{EpochKey, EthashOutput, cache_size, dataset_size, epoch_from_seed, seed_hash};
pub use kawpow::{KawpowOutput, final_hash as kawpow_final};
pub use params::*;
pub use primitives::{k12, keccak256, keccak512, sha3_256};
pub use randomx::{RandomX, RandomXCache, RandomXDataset, RandomXVariant, randomx};

#[cfg(test)]
mod tests;
