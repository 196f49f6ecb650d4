//! KawPow (ProgPoW 0.9.4 as deployed by Ravencoin).
//!
//! Runs on the Ethash cache/dataset with a 7500-block epoch. Every three
//! blocks a new random program is drawn; each hash executes that program
//! 64 times over 16 lanes of 32 registers.

use crate::error::{Error, Result};
use crate::ethash::{EpochKey, FullDataset, LightCache, Node};
use crate::params::{
    ETHASH_MAX_EPOCH, KAWPOW_CACHE_WORDS, KAWPOW_CNT_CACHE, KAWPOW_CNT_DAG, KAWPOW_CNT_MATH,
    KAWPOW_DAG_LOADS, KAWPOW_EPOCH_LENGTH, KAWPOW_LANES, KAWPOW_PERIOD_LENGTH, KAWPOW_REGS,
};
use crate::primitives::keccak::keccakf800;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// "rAVENCOINKAWPOW", one character per word.
const RAVENCOIN_KAWPOW: [u32; 15] = [
    0x72, 0x41, 0x56, 0x45, 0x4E, 0x43, 0x4F, 0x49, 0x4E, 0x4B, 0x41, 0x57, 0x50, 0x4F, 0x57,
];

type Mix = [[u32; KAWPOW_REGS]; KAWPOW_LANES];

#[inline(always)]
fn fnv1a(h: u32, d: u32) -> u32 {
    (h ^ d).wrapping_mul(0x0100_0193)
}

#[derive(Clone)]
struct Kiss99 {
    z: u32,
    w: u32,
    jsr: u32,
    jcong: u32,
}

impl Kiss99 {
    fn next(&mut self) -> u32 {
        self.z = 36969u32
            .wrapping_mul(self.z & 0xffff)
            .wrapping_add(self.z >> 16);
        self.w = 18000u32
            .wrapping_mul(self.w & 0xffff)
            .wrapping_add(self.w >> 16);
        let mwc = (self.z << 16).wrapping_add(self.w);
        self.jsr ^= self.jsr << 17;
        self.jsr ^= self.jsr >> 13;
        self.jsr ^= self.jsr << 5;
        self.jcong = 69069u32.wrapping_mul(self.jcong).wrapping_add(1_234_567);
        (mwc ^ self.jcong).wrapping_add(self.jsr)
    }
}

/// Random program state for one period. Every loop iteration replays it
/// from the start.
#[derive(Clone)]
struct Program {
    rng: Kiss99,
    dst: [u32; KAWPOW_REGS],
    src: [u32; KAWPOW_REGS],
    dst_counter: usize,
    src_counter: usize,
}

impl Program {
    fn new(period: u64) -> Self {
        let lo = period as u32;
        let hi = (period >> 32) as u32;
        let z = fnv1a(FNV_OFFSET_BASIS, lo);
        let w = fnv1a(z, hi);
        let jsr = fnv1a(w, lo);
        let jcong = fnv1a(jsr, hi);
        let mut rng = Kiss99 { z, w, jsr, jcong };

        let mut dst: [u32; KAWPOW_REGS] = core::array::from_fn(|i| i as u32);
        let mut src = dst;
        for i in (2..=KAWPOW_REGS).rev() {
            dst.swap(i - 1, rng.next() as usize % i);
            src.swap(i - 1, rng.next() as usize % i);
        }

        Self {
            rng,
            dst,
            src,
            dst_counter: 0,
            src_counter: 0,
        }
    }

    fn next_dst(&mut self) -> usize {
        let r = self.dst[self.dst_counter % KAWPOW_REGS];
        self.dst_counter += 1;
        r as usize
    }

    fn next_src(&mut self) -> usize {
        let r = self.src[self.src_counter % KAWPOW_REGS];
        self.src_counter += 1;
        r as usize
    }
}

fn random_math(a: u32, b: u32, selector: u32) -> u32 {
    match selector % 11 {
        0 => a.wrapping_add(b),
        1 => a.wrapping_mul(b),
        2 => ((a as u64 * b as u64) >> 32) as u32,
        3 => a.min(b),
        4 => a.rotate_left(b & 31),
        5 => a.rotate_right(b & 31),
        6 => a & b,
        7 => a | b,
        8 => a ^ b,
        9 => a.leading_zeros() + b.leading_zeros(),
        _ => a.count_ones() + b.count_ones(),
    }
}

fn random_merge(a: &mut u32, b: u32, selector: u32) {
    let x = (selector >> 16) % 31 + 1;
    *a = match selector % 4 {
        0 => a.wrapping_mul(33).wrapping_add(b),
        1 => (*a ^ b).wrapping_mul(33),
        2 => a.rotate_left(x) ^ b,
        _ => a.rotate_right(x) ^ b,
    };
}

fn seed_state(header: &[u8; 32], nonce: u64) -> [u32; 8] {
    let mut state = [0u32; 25];
    for (w, chunk) in state.iter_mut().zip(header.chunks_exact(4)) {
        *w = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    state[8] = nonce as u32;
    state[9] = (nonce >> 32) as u32;
    state[10..].copy_from_slice(&RAVENCOIN_KAWPOW);
    keccakf800(&mut state);

    let mut out = [0u32; 8];
    out.copy_from_slice(&state[..8]);
    out
}

fn init_mix(seed: &[u32; 8]) -> Mix {
    let z = fnv1a(FNV_OFFSET_BASIS, seed[0]);
    let w = fnv1a(z, seed[1]);
    let mut mix = [[0u32; KAWPOW_REGS]; KAWPOW_LANES];
    for (lane, regs) in mix.iter_mut().enumerate() {
        let jsr = fnv1a(w, lane as u32);
        let jcong = fnv1a(jsr, lane as u32);
        let mut rng = Kiss99 { z, w, jsr, jcong };
        for r in regs.iter_mut() {
            *r = rng.next();
        }
    }
    mix
}

/// Epoch-scoped state: the Ethash light cache for the KawPow epoch plus
/// the 16 KiB prefix of the dataset used for random cache reads.
pub struct KawpowCache {
    epoch: u64,
    light: LightCache,
    l1: Vec<u32>,
}

impl KawpowCache {
    pub fn build(epoch: u64) -> Result<Self> {
        let light = LightCache::build(EpochKey::from_epoch(epoch)?)?;
        let mut l1 = Vec::with_capacity(KAWPOW_CACHE_WORDS);
        for i in 0..(KAWPOW_CACHE_WORDS / 16) as u32 {
            l1.extend_from_slice(&light.dataset_item(i));
        }
        Ok(Self { epoch, light, l1 })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn light(&self) -> &LightCache {
        &self.light
    }
}

pub fn epoch_for_height(height: u64) -> Result<u64> {
    let epoch = height / KAWPOW_EPOCH_LENGTH;
    if epoch >= ETHASH_MAX_EPOCH {
        return Err(Error::UnsupportedEpoch {
            epoch,
            max: ETHASH_MAX_EPOCH - 1,
        });
    }
    Ok(epoch)
}

/// KawPow result in natural byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KawpowOutput {
    pub final_hash: [u8; 32],
    pub mix_hash: [u8; 32],
}

fn hash_mix<F>(l1: &[u32], height: u64, seed: &[u32; 8], items: u32, lookup: F) -> [u32; 8]
where
    F: Fn(u32) -> Node,
{
    let mut mix = init_mix(seed);
    let program = Program::new(height / KAWPOW_PERIOD_LENGTH);
    // 2048-bit items, four dataset nodes each
    let pages = items / 4;

    for r in 0..KAWPOW_CNT_DAG {
        let mut prog = program.clone();
        let page = mix[r % KAWPOW_LANES][0] % pages;
        let mut item = [0u32; 64];
        for (n, chunk) in item.chunks_exact_mut(16).enumerate() {
            chunk.copy_from_slice(&lookup(page * 4 + n as u32));
        }

        for i in 0..KAWPOW_CNT_CACHE.max(KAWPOW_CNT_MATH) {
            if i < KAWPOW_CNT_CACHE {
                let src = prog.next_src();
                let dst = prog.next_dst();
                let sel = prog.rng.next();
                for lane in mix.iter_mut() {
                    let offset = lane[src] as usize % KAWPOW_CACHE_WORDS;
                    random_merge(&mut lane[dst], l1[offset], sel);
                }
            }
            if i < KAWPOW_CNT_MATH {
                let src_rnd = prog.rng.next() as usize % (KAWPOW_REGS * (KAWPOW_REGS - 1));
                let src1 = src_rnd % KAWPOW_REGS;
                let mut src2 = src_rnd / KAWPOW_REGS;
                if src2 >= src1 {
                    src2 += 1;
                }
                let sel1 = prog.rng.next();
                let dst = prog.next_dst();
                let sel2 = prog.rng.next();
                for lane in mix.iter_mut() {
                    let data = random_math(lane[src1], lane[src2], sel1);
                    random_merge(&mut lane[dst], data, sel2);
                }
            }
        }

        let mut dsts = [0usize; KAWPOW_DAG_LOADS];
        let mut sels = [0u32; KAWPOW_DAG_LOADS];
        for i in 0..KAWPOW_DAG_LOADS {
            dsts[i] = if i == 0 { 0 } else { prog.next_dst() };
            sels[i] = prog.rng.next();
        }
        for (l, lane) in mix.iter_mut().enumerate() {
            let offset = ((l ^ r) % KAWPOW_LANES) * KAWPOW_DAG_LOADS;
            for i in 0..KAWPOW_DAG_LOADS {
                random_merge(&mut lane[dsts[i]], item[offset + i], sels[i]);
            }
        }
    }

    let mut mix_hash = [FNV_OFFSET_BASIS; 8];
    for (l, lane) in mix.iter().enumerate() {
        let lane_hash = lane.iter().fold(FNV_OFFSET_BASIS, |h, &w| fnv1a(h, w));
        mix_hash[l % 8] = fnv1a(mix_hash[l % 8], lane_hash);
    }
    mix_hash
}

fn finalize(seed: &[u32; 8], mix_hash: &[u32; 8]) -> [u8; 32] {
    let mut state = [0u32; 25];
    state[..8].copy_from_slice(seed);
    state[8..16].copy_from_slice(mix_hash);
    state[16..].copy_from_slice(&RAVENCOIN_KAWPOW[..9]);
    keccakf800(&mut state);

    let mut out = [0u8; 32];
    for (chunk, w) in out.chunks_exact_mut(4).zip(&state[..8]) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

fn words_to_bytes(words: &[u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, w) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

fn bytes_to_words(bytes: &[u8; 32]) -> [u32; 8] {
    core::array::from_fn(|i| {
        u32::from_le_bytes([
            bytes[4 * i],
            bytes[4 * i + 1],
            bytes[4 * i + 2],
            bytes[4 * i + 3],
        ])
    })
}

fn hash_with<F>(cache: &KawpowCache, height: u64, header: &[u8; 32], nonce: u64, lookup: F) -> KawpowOutput
where
    F: Fn(u32) -> Node,
{
    let seed = seed_state(header, nonce);
    let items = cache.light.dataset_items();
    let mix_hash = hash_mix(&cache.l1, height, &seed, items, lookup);
    KawpowOutput {
        final_hash: finalize(&seed, &mix_hash),
        mix_hash: words_to_bytes(&mix_hash),
    }
}

/// Hash deriving dataset items from the light cache on demand.
pub fn hash_light(cache: &KawpowCache, height: u64, header: &[u8; 32], nonce: u64) -> KawpowOutput {
    hash_with(cache, height, header, nonce, |i| cache.light.dataset_item(i))
}

/// Hash against a materialized dataset of the same epoch.
pub fn hash_full(
    cache: &KawpowCache,
    dataset: &FullDataset,
    height: u64,
    header: &[u8; 32],
    nonce: u64,
) -> KawpowOutput {
    hash_with(cache, height, header, nonce, |i| dataset.item(i))
}

/// Final hash from a miner-supplied mix hash. Needs no epoch state, so a
/// pool can cheaply score a share before deciding to verify the mix.
pub fn final_hash(header: &[u8; 32], nonce: u64, mix_hash: &[u8; 32]) -> [u8; 32] {
    finalize(&seed_state(header, nonce), &bytes_to_words(mix_hash))
}

/// Recompute the mix and return the final hash only if it matches.
pub fn verify(
    cache: &KawpowCache,
    height: u64,
    header: &[u8; 32],
    nonce: u64,
    mix_hash: &[u8; 32],
) -> Option<[u8; 32]> {
    let out = hash_light(cache, height, header, nonce);
    (&out.mix_hash == mix_hash).then_some(out.final_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> [u8; 32] {
        hex::decode("ffeeddccbbaa9988776655443322110000112233445566778899aabbccddeeff")
            .unwrap()
            .try_into()
            .unwrap()
    }

    #[test]
    fn test_kiss99_reference_sequence() {
        // First outputs of the published KISS99 test (z=362436069, w=521288629,
        // jsr=123456789, jcong=380116160)
        let mut rng = Kiss99 {
            z: 362_436_069,
            w: 521_288_629,
            jsr: 123_456_789,
            jcong: 380_116_160,
        };
        assert_eq!(rng.next(), 769_445_856);
        assert_eq!(rng.next(), 742_012_328);
        assert_eq!(rng.next(), 2_121_196_314);
        assert_eq!(rng.next(), 2_805_620_942);
    }

    #[test]
    fn test_program_permutations_are_bijective() {
        let p = Program::new(10_000);
        let mut dst = p.dst;
        let mut src = p.src;
        dst.sort_unstable();
        src.sort_unstable();
        let identity: [u32; KAWPOW_REGS] = core::array::from_fn(|i| i as u32);
        assert_eq!(dst, identity);
        assert_eq!(src, identity);
    }

    #[test]
    fn test_random_math_edges() {
        assert_eq!(random_math(0, 0, 9), 64);
        assert_eq!(random_math(u32::MAX, u32::MAX, 2), u32::MAX - 1);
        assert_eq!(random_math(1, 33, 4), 2);
    }

    #[test]
    fn test_epoch_for_height() {
        assert_eq!(epoch_for_height(30_000).unwrap(), 4);
        assert!(epoch_for_height(ETHASH_MAX_EPOCH * KAWPOW_EPOCH_LENGTH).is_err());
    }

    #[test]
    fn test_hash_light_block_30000() {
        let cache = KawpowCache::build(epoch_for_height(30_000).unwrap()).unwrap();
        let out = hash_light(&cache, 30_000, &header(), 0x1234_5678_9abc_def0);
        assert_eq!(
            hex::encode(out.mix_hash),
            "d510f22b43969f8eefd9a8080bc2250ae6182c0abcbc05acf4c110ee306db152"
        );
        assert_eq!(
            hex::encode(out.final_hash),
            "26c8489150607aba6a81430a44d3b1526c205af431faa2a4ff9a029810f74d75"
        );

        // The final hash is reproducible from the mix alone.
        assert_eq!(
            final_hash(&header(), 0x1234_5678_9abc_def0, &out.mix_hash),
            out.final_hash
        );
        assert_eq!(
            verify(&cache, 30_000, &header(), 0x1234_5678_9abc_def0, &out.mix_hash),
            Some(out.final_hash)
        );
        assert_eq!(
            verify(&cache, 30_000, &header(), 0x1234_5678_9abc_def0, &[0u8; 32]),
            None
        );
    }

    // Block 30000 values below agree with a separate C implementation of
    // ProgPoW 0.9.4 using the Ravencoin KawPow constants.
    #[test]
    fn test_final_hash_vector() {
        let mix: [u8; 32] =
            hex::decode("d510f22b43969f8eefd9a8080bc2250ae6182c0abcbc05acf4c110ee306db152")
                .unwrap()
                .try_into()
                .unwrap();
        // Pools send the nonce as eight big-endian bytes.
        let nonce = u64::from_be_bytes(hex::decode("123456789abcdef0").unwrap().try_into().unwrap());
        assert_eq!(
            hex::encode(final_hash(&header(), nonce, &mix)),
            "26c8489150607aba6a81430a44d3b1526c205af431faa2a4ff9a029810f74d75"
        );

        let mut other = mix;
        other[31] ^= 0x80;
        assert_ne!(
            hex::encode(final_hash(&header(), nonce, &other)),
            "26c8489150607aba6a81430a44d3b1526c205af431faa2a4ff9a029810f74d75"
        );
    }

    #[test]
    #[ignore = "the pool harness calls the three-argument binding with four arguments, so it never produced this digest"]
    fn test_legacy_pool_vector() {
        let cache = KawpowCache::build(4).unwrap();
        let out = hash_light(&cache, 30_000, &header(), 0x1234_5678_9abc_def0);
        assert_eq!(
            hex::encode(out.final_hash),
            "177b565752a375501e11b6d9d3679c2df6197b2cab3a1ba2d6b10b8c71a3d459"
        );
    }
}
