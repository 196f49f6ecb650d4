//! RandomX and its parameter variants.
//!
//! The key fills a 256 MiB Argon2d cache and seeds eight superscalar
//! programs that derive dataset items from cache lines. Light mode derives
//! every item on demand; full mode materializes all of them first. Each
//! hash then runs a chain of generated VM programs over a scratchpad and
//! compresses the final register file.

mod aes_gen;
mod blake2_gen;
mod float;
mod program;
mod superscalar;
mod vm;

use argon2::{Algorithm, Argon2, Block, Params, Version};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512, Digest};

use crate::codec::alloc_arena;
use crate::error::{Error, Result};
use crate::params::{
    RANDOMX_ARGON_LANES, RANDOMX_ARGON_MEMORY, RANDOMX_CACHE_ACCESSES, RANDOMX_DATASET_ITEMS,
};
use blake2_gen::Blake2Generator;
use superscalar::SuperscalarProgram;
use vm::Vm;

/// 64-bit words of a cache line or dataset item.
pub type Item = [u64; 8];

/// Words per Argon2 block.
const BLOCK_WORDS: usize = 128;
const LINES_PER_BLOCK: usize = BLOCK_WORDS / 8;
const CACHE_LINES: u64 = RANDOMX_ARGON_MEMORY as u64 * LINES_PER_BLOCK as u64;

const ITEM_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const ITEM_XOR: [u64; 7] = [
    9_298_411_001_130_361_340,
    12_065_312_585_734_608_966,
    9_306_329_213_124_626_780,
    5_281_919_268_842_080_866,
    10_536_153_434_571_861_004,
    3_398_623_926_847_679_864,
    9_549_104_520_008_361_294,
];

pub(crate) fn blake2b512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Blake2b512::digest(data));
    out
}

pub(crate) fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b::<U32>::digest(data));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomXVariant {
    /// Monero RandomX
    Rx0,
    /// ArQmA
    Arq,
    /// Kevacoin
    Keva,
}

/// Per-variant tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomXConfig {
    pub salt: &'static [u8],
    pub argon_iterations: u32,
    pub program_iterations: u32,
    pub program_count: u32,
    pub scratchpad_l2: usize,
    pub scratchpad_l3: usize,
}

const RX0: RandomXConfig = RandomXConfig {
    salt: b"RandomX\x03",
    argon_iterations: 3,
    program_iterations: 2048,
    program_count: 8,
    scratchpad_l2: 262_144,
    scratchpad_l3: 2_097_152,
};

const ARQ: RandomXConfig = RandomXConfig {
    salt: b"RandomARQ\x01",
    argon_iterations: 1,
    program_iterations: 1024,
    program_count: 4,
    scratchpad_l2: 131_072,
    scratchpad_l3: 262_144,
};

const KEVA: RandomXConfig = RandomXConfig {
    salt: b"RandomKV\x01",
    argon_iterations: 3,
    program_iterations: 2048,
    program_count: 8,
    scratchpad_l2: 131_072,
    scratchpad_l3: 1_048_576,
};

impl RandomXVariant {
    pub const ALL: [RandomXVariant; 3] = [Self::Rx0, Self::Arq, Self::Keva];

    /// Variant by its numeric id: 0 RandomX, 2 RandomARQ, 19 RandomKEVA.
    pub fn from_id(id: u64) -> Result<Self> {
        match id {
            0 => Ok(Self::Rx0),
            2 => Ok(Self::Arq),
            19 => Ok(Self::Keva),
            _ => Err(Error::variant("randomx", id)),
        }
    }

    pub fn id(self) -> u64 {
        match self {
            Self::Rx0 => 0,
            Self::Arq => 2,
            Self::Keva => 19,
        }
    }

    pub fn config(self) -> &'static RandomXConfig {
        match self {
            Self::Rx0 => &RX0,
            Self::Arq => &ARQ,
            Self::Keva => &KEVA,
        }
    }
}

/// Argon2d cache plus the superscalar programs that expand it.
pub struct RandomXCache {
    variant: RandomXVariant,
    key: Vec<u8>,
    blocks: Vec<Block>,
    programs: Vec<SuperscalarProgram>,
}

impl RandomXCache {
    pub fn build(variant: RandomXVariant, key: &[u8]) -> Result<Self> {
        let config = variant.config();
        let mut blocks: Vec<Block> = alloc_arena(RANDOMX_ARGON_MEMORY as usize)?;
        let params = Params::new(
            RANDOMX_ARGON_MEMORY,
            config.argon_iterations,
            RANDOMX_ARGON_LANES,
            None,
        )?;
        Argon2::new(Algorithm::Argon2d, Version::V0x13, params).fill_memory(
            key,
            config.salt,
            &mut blocks,
        )?;

        let mut rng = Blake2Generator::new(key, 0);
        let programs: Vec<SuperscalarProgram> = (0..RANDOMX_CACHE_ACCESSES)
            .map(|_| SuperscalarProgram::generate(&mut rng))
            .collect();

        tracing::debug!(
            ?variant,
            blocks = blocks.len(),
            program_sizes = ?programs.iter().map(SuperscalarProgram::len).collect::<Vec<_>>(),
            "randomx cache built"
        );
        Ok(Self {
            variant,
            key: key.to_vec(),
            blocks,
            programs,
        })
    }

    pub fn variant(&self) -> RandomXVariant {
        self.variant
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// 64-byte cache line, wrapping around the cache.
    fn line(&self, index: u64) -> Item {
        let index = (index % CACHE_LINES) as usize;
        let words: &[u64] = self.blocks[index / LINES_PER_BLOCK].as_ref();
        let start = (index % LINES_PER_BLOCK) * 8;
        let mut line = [0u64; 8];
        line.copy_from_slice(&words[start..start + 8]);
        line
    }

    /// Derive dataset item `index`.
    pub fn dataset_item(&self, index: u64) -> Item {
        let mut r = item_registers(index);
        let mut address = index;
        for program in &self.programs {
            let line = self.line(address);
            program.execute(&mut r);
            for (reg, word) in r.iter_mut().zip(line) {
                *reg ^= word;
            }
            address = r[program.address_register()];
        }
        r
    }
}

/// Register file a dataset item starts from.
fn item_registers(index: u64) -> Item {
    let mut r = [0u64; 8];
    let r0 = (index + 1).wrapping_mul(ITEM_MULTIPLIER);
    r[0] = r0;
    for (reg, x) in r[1..].iter_mut().zip(ITEM_XOR) {
        *reg = r0 ^ x;
    }
    r
}

/// Every dataset item, materialized.
pub struct RandomXDataset {
    variant: RandomXVariant,
    key: Vec<u8>,
    items: Vec<Item>,
}

impl RandomXDataset {
    pub fn build(cache: &RandomXCache) -> Result<Self> {
        let mut items: Vec<Item> = alloc_arena(RANDOMX_DATASET_ITEMS as usize)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            items
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, item)| *item = cache.dataset_item(i as u64));
        }
        #[cfg(not(feature = "parallel"))]
        for (i, item) in items.iter_mut().enumerate() {
            *item = cache.dataset_item(i as u64);
        }

        tracing::debug!(variant = ?cache.variant(), items = items.len(), "randomx dataset built");
        Ok(Self {
            variant: cache.variant(),
            key: cache.key().to_vec(),
            items,
        })
    }

    pub fn variant(&self) -> RandomXVariant {
        self.variant
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn item(&self, index: u64) -> Item {
        self.items[index as usize]
    }
}

/// Reusable hasher; keeps the scratchpad of the last variant it ran.
#[derive(Default)]
pub struct RandomX {
    vm: Option<Vm>,
}

impl RandomX {
    pub fn new() -> Self {
        Self::default()
    }

    fn vm(&mut self, variant: RandomXVariant) -> Result<&mut Vm> {
        let config = *variant.config();
        let vm = match self.vm.take() {
            Some(vm) if *vm.config() == config => vm,
            _ => Vm::new(config)?,
        };
        Ok(self.vm.insert(vm))
    }

    /// Hash with dataset items computed from the cache on demand.
    pub fn hash_light(&mut self, cache: &RandomXCache, input: &[u8]) -> Result<[u8; 32]> {
        let vm = self.vm(cache.variant())?;
        Ok(vm.hash(input, |i| cache.dataset_item(i)))
    }

    pub fn hash_full(&mut self, dataset: &RandomXDataset, input: &[u8]) -> Result<[u8; 32]> {
        let vm = self.vm(dataset.variant())?;
        Ok(vm.hash(input, |i| dataset.item(i)))
    }
}

/// One-shot light-mode hash. Builds a fresh cache, so callers hashing
/// more than once per key should keep a [`RandomXCache`] instead.
pub fn randomx(input: &[u8], key: &[u8], variant: RandomXVariant) -> Result<[u8; 32]> {
    let cache = RandomXCache::build(variant, key)?;
    RandomX::new().hash_light(&cache, input)
}
