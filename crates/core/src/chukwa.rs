//! Argon2id proof-of-work family (TurtleCoin Chukwa and relatives).
//!
//! The whole input is the password and its first 16 bytes the salt.

use argon2::{Algorithm, Argon2, Block, Params, Version};

use crate::codec::alloc_arena;
use crate::error::{Error, Result};

const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Argon2Variant {
    Chukwa,
    Wrkz,
    ChukwaV2,
}

impl Argon2Variant {
    pub fn from_id(id: u64) -> Result<Self> {
        match id {
            0 => Ok(Self::Chukwa),
            1 => Ok(Self::Wrkz),
            2 => Ok(Self::ChukwaV2),
            _ => Err(Error::variant("argon2", id)),
        }
    }

    /// `(iterations, memory in KiB)`
    fn cost(self) -> (u32, u32) {
        match self {
            Self::Chukwa => (3, 512),
            Self::Wrkz => (4, 256),
            Self::ChukwaV2 => (4, 1024),
        }
    }
}

/// Reusable Argon2id hasher; keeps its block arena between calls.
pub struct Argon2Hasher {
    variant: Argon2Variant,
    ctx: Argon2<'static>,
    blocks: Vec<Block>,
}

impl Argon2Hasher {
    pub fn new(variant: Argon2Variant) -> Result<Self> {
        let (t_cost, m_cost) = variant.cost();
        let params = Params::new(m_cost, t_cost, 1, Some(OUTPUT_LEN))?;
        let blocks = alloc_arena(params.block_count())?;
        Ok(Self {
            variant,
            ctx: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            blocks,
        })
    }

    pub fn variant(&self) -> Argon2Variant {
        self.variant
    }

    pub fn hash(&mut self, input: &[u8]) -> Result<[u8; 32]> {
        if input.len() < SALT_LEN {
            return Err(Error::length("argon2 input", SALT_LEN, input.len()));
        }
        let mut out = [0u8; OUTPUT_LEN];
        self.ctx
            .hash_password_into_with_memory(input, &input[..SALT_LEN], &mut out, &mut self.blocks)?;
        Ok(out)
    }
}

pub fn argon2(input: &[u8], variant: Argon2Variant) -> Result<[u8; 32]> {
    Argon2Hasher::new(variant)?.hash(input)
}
