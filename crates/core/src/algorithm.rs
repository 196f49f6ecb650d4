//! Closed algorithm set and the engine that dispatches over it.
//!
//! Each [`Algorithm`] variant carries its own parameters. The [`Engine`]
//! validates widths up front, then resolves per-epoch state through one
//! [`EpochCache`] slot per cached structure.

use std::sync::Arc;

use crate::astrobwt::{AstroBwtVariant, astrobwt};
use crate::chukwa::{Argon2Variant, argon2};
use crate::codec::{reversed, to_array};
use crate::cryptonight::{CnVariant, cryptonight, ghostrider};
use crate::cuckaroo::{CycleVariant, cycle_hash};
use crate::epoch_cache::EpochCache;
use crate::error::Result;
use crate::ethash::{
    EpochKey, EthashOutput, FullDataset, LightCache, epoch_from_seed, hashimoto_full,
    hashimoto_light,
};
use crate::kawpow::{self, KawpowCache, KawpowOutput};
use crate::primitives::{k12, keccak256, sha3_256};
use crate::randomx::{RandomX, RandomXCache, RandomXDataset, RandomXVariant};

/// Cryptonight id that selects the Ghostrider chain.
const GHOSTRIDER_ID: u32 = 18;

const RANDOMX_SEED_LEN: usize = 32;

/// How an Ethash request names its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthashEpoch<'a> {
    Height(u64),
    /// 32-byte seed hash, resolved by walking the seed chain.
    SeedHash(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoNightFamily {
    Classic,
    Light,
    Heavy,
    Pico,
}

/// One hashing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm<'a> {
    Keccak256 {
        input: &'a [u8],
    },
    Sha3_256 {
        input: &'a [u8],
    },
    K12 {
        input: &'a [u8],
    },
    /// Digest of a solved Cuckaroo-29 ring of edge indices.
    CycleHash {
        ring: &'a [u32],
        variant: CycleVariant,
    },
    /// `variant` is the numeric id within `family`; classic id 18 runs
    /// the Ghostrider chain. `height` feeds cn/r.
    CryptoNight {
        family: CryptoNightFamily,
        input: &'a [u8],
        variant: u32,
        height: u64,
    },
    RandomX {
        input: &'a [u8],
        seed: &'a [u8],
        variant: u64,
    },
    /// Digest is returned reversed. Nonce is 8 bytes, big-endian.
    Ethash {
        header: &'a [u8],
        nonce: &'a [u8],
        epoch: EthashEpoch<'a>,
    },
    Etchash {
        header: &'a [u8],
        nonce: &'a [u8],
        height: u64,
    },
    /// `target` is accepted for contract parity only.
    KawPow {
        height: u64,
        header: &'a [u8],
        nonce: u64,
        target: u32,
    },
    AstroBwt {
        input: &'a [u8],
        mode: u64,
    },
    Argon2 {
        input: &'a [u8],
        variant: u64,
    },
}

impl Algorithm<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keccak256 { .. } => "keccak256",
            Self::Sha3_256 { .. } => "sha3_256",
            Self::K12 { .. } => "k12",
            Self::CycleHash { variant, .. } => variant.name(),
            Self::CryptoNight { family, .. } => match family {
                CryptoNightFamily::Classic => "cryptonight",
                CryptoNightFamily::Light => "cryptonight_light",
                CryptoNightFamily::Heavy => "cryptonight_heavy",
                CryptoNightFamily::Pico => "cryptonight_pico",
            },
            Self::RandomX { .. } => "randomx",
            Self::Ethash { .. } => "ethash",
            Self::Etchash { .. } => "etchash",
            Self::KawPow { .. } => "kawpow",
            Self::AstroBwt { .. } => "astrobwt",
            Self::Argon2 { .. } => "argon2",
        }
    }
}

/// Runtime options for the memory-hard engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Materialize the full Ethash/Etchash/KawPow dataset instead of
    /// deriving items from the light cache.
    pub ethash_full_dataset: bool,
    /// Materialize the 2 GiB RandomX dataset.
    pub randomx_full_dataset: bool,
}

/// Light cache plus the optional materialized dataset of one epoch.
pub struct EthashState {
    pub cache: LightCache,
    pub dataset: Option<FullDataset>,
}

impl EthashState {
    fn build(key: EpochKey, full: bool) -> Result<Self> {
        let cache = LightCache::build(key)?;
        let dataset = full.then(|| FullDataset::build(&cache)).transpose()?;
        Ok(Self { cache, dataset })
    }

    fn hashimoto(&self, header: &[u8; 32], nonce: u64) -> EthashOutput {
        match &self.dataset {
            Some(dataset) => hashimoto_full(dataset, header, nonce),
            None => hashimoto_light(&self.cache, header, nonce),
        }
    }
}

pub struct KawpowState {
    pub cache: KawpowCache,
    pub dataset: Option<FullDataset>,
}

pub struct RandomXState {
    pub cache: RandomXCache,
    pub dataset: Option<RandomXDataset>,
}

/// Dispatcher owning every cached epoch structure.
pub struct Engine {
    config: EngineConfig,
    ethash: EpochCache<EpochKey, EthashState>,
    etchash: EpochCache<EpochKey, EthashState>,
    kawpow: EpochCache<u64, KawpowState>,
    randomx: [EpochCache<[u8; 32], RandomXState>; 3],
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ethash: EpochCache::new("ethash"),
            etchash: EpochCache::new("etchash"),
            kawpow: EpochCache::new("kawpow"),
            randomx: [
                EpochCache::new("randomx"),
                EpochCache::new("randomx-arq"),
                EpochCache::new("randomx-keva"),
            ],
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Compute the 32-byte digest for `algorithm`.
    pub fn hash(&self, algorithm: &Algorithm<'_>) -> Result<[u8; 32]> {
        match *algorithm {
            Algorithm::Keccak256 { input } => Ok(keccak256(input)),
            Algorithm::Sha3_256 { input } => Ok(sha3_256(input)),
            Algorithm::K12 { input } => Ok(k12(input)),
            Algorithm::CycleHash { ring, variant } => cycle_hash(ring, variant),
            Algorithm::CryptoNight {
                family,
                input,
                variant,
                height,
            } => {
                if family == CryptoNightFamily::Classic && variant == GHOSTRIDER_ID {
                    return ghostrider(input);
                }
                let variant = match family {
                    CryptoNightFamily::Classic => CnVariant::classic(variant)?,
                    CryptoNightFamily::Light => CnVariant::light(variant)?,
                    CryptoNightFamily::Heavy => CnVariant::heavy(variant)?,
                    CryptoNightFamily::Pico => CnVariant::pico(variant)?,
                };
                cryptonight(input, variant, height)
            }
            Algorithm::RandomX {
                input,
                seed,
                variant,
            } => self.randomx(input, seed, RandomXVariant::from_id(variant)?),
            Algorithm::Ethash {
                header,
                nonce,
                epoch,
            } => {
                let (header, nonce) = header_and_nonce(header, nonce)?;
                let key = match epoch {
                    EthashEpoch::Height(height) => EpochKey::ethash(height)?,
                    EthashEpoch::SeedHash(seed) => {
                        let seed = to_array::<32>("ethash seed hash", seed)?;
                        EpochKey::from_epoch(epoch_from_seed(&seed)?)?
                    }
                };
                Ok(reversed(self.ethash(key, &header, nonce)?.result))
            }
            Algorithm::Etchash {
                header,
                nonce,
                height,
            } => {
                let (header, nonce) = header_and_nonce(header, nonce)?;
                Ok(reversed(self.etchash(height, &header, nonce)?.result))
            }
            Algorithm::KawPow {
                height,
                header,
                nonce,
                target: _,
            } => {
                let header = to_array::<32>("kawpow header", header)?;
                Ok(self.kawpow(height, &header, nonce)?.final_hash)
            }
            Algorithm::AstroBwt { input, mode } => {
                astrobwt(input, AstroBwtVariant::from_id(mode)?)
            }
            Algorithm::Argon2 { input, variant } => {
                argon2(input, Argon2Variant::from_id(variant)?)
            }
        }
    }

    fn ethash_state(&self, key: EpochKey) -> Result<Arc<EthashState>> {
        let full = self.config.ethash_full_dataset;
        self.ethash
            .get_or_build(key, |key| EthashState::build(*key, full))
    }

    /// Ethash result and mix hash in natural byte order.
    pub fn ethash(&self, key: EpochKey, header: &[u8; 32], nonce: u64) -> Result<EthashOutput> {
        Ok(self.ethash_state(key)?.hashimoto(header, nonce))
    }

    pub fn ethash_by_height(&self, height: u64, header: &[u8; 32], nonce: u64) -> Result<EthashOutput> {
        self.ethash(EpochKey::ethash(height)?, header, nonce)
    }

    pub fn ethash_by_seed(&self, seed: &[u8; 32], header: &[u8; 32], nonce: u64) -> Result<EthashOutput> {
        self.ethash(EpochKey::from_epoch(epoch_from_seed(seed)?)?, header, nonce)
    }

    pub fn etchash(&self, height: u64, header: &[u8; 32], nonce: u64) -> Result<EthashOutput> {
        let full = self.config.ethash_full_dataset;
        let state = self
            .etchash
            .get_or_build(EpochKey::etchash(height)?, |key| EthashState::build(*key, full))?;
        Ok(state.hashimoto(header, nonce))
    }

    fn kawpow_state(&self, height: u64) -> Result<Arc<KawpowState>> {
        let full = self.config.ethash_full_dataset;
        self.kawpow
            .get_or_build(kawpow::epoch_for_height(height)?, |&epoch| {
                let cache = KawpowCache::build(epoch)?;
                let dataset = full.then(|| FullDataset::build(cache.light())).transpose()?;
                Ok(KawpowState { cache, dataset })
            })
    }

    pub fn kawpow(&self, height: u64, header: &[u8; 32], nonce: u64) -> Result<KawpowOutput> {
        let state = self.kawpow_state(height)?;
        Ok(match &state.dataset {
            Some(dataset) => kawpow::hash_full(&state.cache, dataset, height, header, nonce),
            None => kawpow::hash_light(&state.cache, height, header, nonce),
        })
    }

    /// Final hash if `mix_hash` is the correct mix for this header and nonce.
    pub fn kawpow_verify(
        &self,
        height: u64,
        header: &[u8; 32],
        nonce: u64,
        mix_hash: &[u8; 32],
    ) -> Result<Option<[u8; 32]>> {
        let state = self.kawpow_state(height)?;
        Ok(kawpow::verify(&state.cache, height, header, nonce, mix_hash))
    }

    fn randomx_slot(&self, variant: RandomXVariant) -> &EpochCache<[u8; 32], RandomXState> {
        match variant {
            RandomXVariant::Rx0 => &self.randomx[0],
            RandomXVariant::Arq => &self.randomx[1],
            RandomXVariant::Keva => &self.randomx[2],
        }
    }

    pub fn randomx(&self, input: &[u8], seed: &[u8], variant: RandomXVariant) -> Result<[u8; 32]> {
        let seed = to_array::<RANDOMX_SEED_LEN>("randomx seed", seed)?;
        let full = self.config.randomx_full_dataset;
        let state = self.randomx_slot(variant).get_or_build(seed, |seed| {
            let cache = RandomXCache::build(variant, seed)?;
            let dataset = full.then(|| RandomXDataset::build(&cache)).transpose()?;
            Ok(RandomXState { cache, dataset })
        })?;

        let mut hasher = RandomX::new();
        match &state.dataset {
            Some(dataset) => hasher.hash_full(dataset, input),
            None => hasher.hash_light(&state.cache, input),
        }
    }

    /// Drop every cached epoch; the next request rebuilds.
    pub fn invalidate_all(&self) {
        self.ethash.invalidate();
        self.etchash.invalidate();
        self.kawpow.invalidate();
        for slot in &self.randomx {
            slot.invalidate();
        }
    }
}

fn header_and_nonce(header: &[u8], nonce: &[u8]) -> Result<([u8; 32], u64)> {
    let header = to_array::<32>("ethash header", header)?;
    let nonce = u64::from_be_bytes(to_array::<8>("ethash nonce", nonce)?);
    Ok((header, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_primitive_dispatch() {
        let engine = Engine::new();
        assert_eq!(
            hex::encode(engine.hash(&Algorithm::Keccak256 { input: b"" }).unwrap()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(engine.hash(&Algorithm::Sha3_256 { input: b"" }).unwrap()),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
        assert_eq!(
            hex::encode(engine.hash(&Algorithm::K12 { input: b"" }).unwrap()),
            "1ac2d450fc3b4205d19da7bfca1b37513c0803577ac7167f06fe2ce1f0ef39e5"
        );
    }

    #[test]
    fn test_cycle_hash_dispatch() {
        let engine = Engine::new();
        let ring = [0u32; 32];
        let algorithm = Algorithm::CycleHash {
            ring: &ring,
            variant: CycleVariant::C29,
        };
        assert_eq!(algorithm.name(), "c29");
        assert_eq!(
            hex::encode(engine.hash(&algorithm).unwrap()),
            "f075943e05cedd3edb5870b87e09fa8ddab8a700266c057c62db682d17d4c963"
        );

        let err = engine
            .hash(&Algorithm::CycleHash {
                ring: &ring,
                variant: CycleVariant::C29i,
            })
            .unwrap_err();
        assert_eq!(err, Error::length("cycle ring", 48, 32));
    }

    #[test]
    fn test_widths_rejected_before_work() {
        let engine = Engine::new();
        let err = engine
            .hash(&Algorithm::Ethash {
                header: &[0u8; 31],
                nonce: &[0u8; 8],
                epoch: EthashEpoch::Height(0),
            })
            .unwrap_err();
        assert_eq!(err, Error::length("ethash header", 32, 31));

        let err = engine
            .hash(&Algorithm::Ethash {
                header: &[0u8; 32],
                nonce: &[0u8; 4],
                epoch: EthashEpoch::Height(0),
            })
            .unwrap_err();
        assert_eq!(err, Error::length("ethash nonce", 8, 4));

        let err = engine
            .hash(&Algorithm::RandomX {
                input: b"This is a test",
                seed: &[0u8; 31],
                variant: 0,
            })
            .unwrap_err();
        assert_eq!(err, Error::length("randomx seed", 32, 31));

        let err = engine
            .hash(&Algorithm::KawPow {
                height: 0,
                header: &[0u8; 33],
                nonce: 0,
                target: 0,
            })
            .unwrap_err();
        assert_eq!(err, Error::length("kawpow header", 32, 33));
    }

    #[test]
    fn test_unknown_variants_rejected() {
        let engine = Engine::new();
        let input = [0u8; 76];
        for (algorithm, id) in [
            (
                Algorithm::RandomX {
                    input: &input,
                    seed: &[0u8; 32],
                    variant: 17,
                },
                17u64,
            ),
            (
                Algorithm::CryptoNight {
                    family: CryptoNightFamily::Classic,
                    input: &input,
                    variant: 11,
                    height: 0,
                },
                11,
            ),
            (Algorithm::AstroBwt { input: &input, mode: 5 }, 5),
            (Algorithm::Argon2 { input: &input, variant: 9 }, 9),
        ] {
            let err = engine.hash(&algorithm).unwrap_err();
            assert_eq!(err, Error::variant(algorithm.name(), id));
        }
    }

    #[test]
    fn test_epoch_out_of_range() {
        let engine = Engine::new();
        let err = engine
            .hash(&Algorithm::Ethash {
                header: &[0u8; 32],
                nonce: &[0u8; 8],
                epoch: EthashEpoch::Height(2048 * 30_000),
            })
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedEpoch { epoch: 2048, max: 2047 });
    }

    #[test]
    fn test_ghostrider_routed_from_cryptonight_id() {
        let engine = Engine::new();
        let err = engine
            .hash(&Algorithm::CryptoNight {
                family: CryptoNightFamily::Classic,
                input: &[0u8; 80],
                variant: GHOSTRIDER_ID,
                height: 0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedVariant { algorithm: "ghostrider core hash", .. }
        ));
    }

    #[test]
    fn test_cryptonight_dispatch_matches_direct_call() {
        let engine = Engine::new();
        let input = b"This is a test This is a test This is a test";
        let direct = cryptonight(input, CnVariant::classic(0).unwrap(), 0).unwrap();
        let dispatched = engine
            .hash(&Algorithm::CryptoNight {
                family: CryptoNightFamily::Classic,
                input,
                variant: 0,
                height: 0,
            })
            .unwrap();
        assert_eq!(direct, dispatched);
    }

    #[test]
    fn test_ethash_state_is_reused_and_rebuilt_identically() {
        let engine = Engine::new();
        let key = EpochKey::from_epoch(0).unwrap();
        let header = [0x42u8; 32];
        let a = engine.ethash_state(key).unwrap();
        let b = engine.ethash_state(key).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let before = engine.ethash(key, &header, 7).unwrap();

        engine.invalidate_all();
        let c = engine.ethash_state(key).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(a.cache.as_bytes().eq(c.cache.as_bytes()));
        assert_eq!(engine.ethash(key, &header, 7).unwrap(), before);
    }
}
