//! Algorithm parameters shared across engines.
//!
//! Ethash sizing constants are reused by KawPow, which runs on the same
//! cache and dataset with a shorter epoch.

/// Blocks per Ethash epoch
pub const ETHASH_EPOCH_LENGTH: u64 = 30_000;

/// Highest epoch with a precomputed size (matches the reference light client)
pub const ETHASH_MAX_EPOCH: u64 = 2048;

/// Cache item / Keccak-512 width in bytes
pub const HASH_BYTES: usize = 64;

/// Mix width in bytes
pub const MIX_BYTES: usize = 128;

/// Cache size at epoch 0 (16 MiB)
pub const CACHE_BYTES_INIT: u64 = 1 << 24;

/// Cache growth per epoch (128 KiB)
pub const CACHE_BYTES_GROWTH: u64 = 1 << 17;

/// Dataset size at epoch 0 (1 GiB)
pub const DATASET_BYTES_INIT: u64 = 1 << 30;

/// Dataset growth per epoch (8 MiB)
pub const DATASET_BYTES_GROWTH: u64 = 1 << 23;

/// Parents mixed into each dataset item
pub const DATASET_PARENTS: u32 = 256;

/// RandMemoHash passes over the cache
pub const CACHE_ROUNDS: usize = 3;

/// Dataset accesses per hashimoto run
pub const ACCESSES: usize = 64;

/// Etchash (ECIP-1099) activation height
pub const ETCHASH_ACTIVATION_HEIGHT: u64 = 11_700_000;

/// Etchash epoch length after activation
pub const ETCHASH_EPOCH_LENGTH: u64 = 60_000;

/// Blocks per KawPow epoch
pub const KAWPOW_EPOCH_LENGTH: u64 = 7_500;

/// Blocks per KawPow program period
pub const KAWPOW_PERIOD_LENGTH: u64 = 3;

/// Lanes processed per KawPow hash
pub const KAWPOW_LANES: usize = 16;

/// Registers per KawPow lane
pub const KAWPOW_REGS: usize = 32;

/// Words read from the dataset per lane per loop
pub const KAWPOW_DAG_LOADS: usize = 4;

/// Cached words of the dataset used for random cache reads (16 KiB)
pub const KAWPOW_CACHE_WORDS: usize = 16 * 1024 / 4;

/// Main loop iterations
pub const KAWPOW_CNT_DAG: usize = 64;

/// Random cache reads per loop
pub const KAWPOW_CNT_CACHE: usize = 11;

/// Random math ops per loop
pub const KAWPOW_CNT_MATH: usize = 18;

/// AstroBWT v1 first-stage buffer length
pub const ASTROBWT_STAGE1_LENGTH: usize = 147_253;

/// AstroBWT v1 second-stage extra length mask
pub const ASTROBWT_STAGE2_MASK: u32 = 0xfffff;

/// AstroBWT v2 keystream length
pub const ASTROBWT_V2_LENGTH: usize = 9_973;

/// RandomX cache size in KiB (Argon2d memory)
pub const RANDOMX_ARGON_MEMORY: u32 = 262_144;

/// Argon2 lanes used to fill the RandomX cache
pub const RANDOMX_ARGON_LANES: u32 = 1;

/// Superscalar programs chained per dataset item
pub const RANDOMX_CACHE_ACCESSES: usize = 8;

/// Target latency in cycles of one superscalar program
pub const RANDOMX_SUPERSCALAR_LATENCY: usize = 170;

/// RandomX dataset base size (2 GiB)
pub const RANDOMX_DATASET_BASE_SIZE: u64 = 2_147_483_648;

/// Extra dataset bytes past the base size
pub const RANDOMX_DATASET_EXTRA_SIZE: u64 = 33_554_368;

/// Number of 64-byte dataset items
pub const RANDOMX_DATASET_ITEMS: u64 = (RANDOMX_DATASET_BASE_SIZE + RANDOMX_DATASET_EXTRA_SIZE) / 64;
