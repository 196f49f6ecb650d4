//! Ethash light cache, full dataset and hashimoto.
//!
//! The cache and dataset are flat arenas of 64-byte nodes addressed by index.
//! Etchash (ECIP-1099) reuses everything here and only changes which epoch
//! picks the seed and which one picks the sizes, see [`EpochKey::etchash`].

use crate::codec::{alloc_arena, words_u32};
use crate::error::{Error, Result};
use crate::params::{
    ACCESSES, CACHE_BYTES_GROWTH, CACHE_BYTES_INIT, CACHE_ROUNDS, DATASET_BYTES_GROWTH,
    DATASET_BYTES_INIT, DATASET_PARENTS, ETCHASH_ACTIVATION_HEIGHT, ETCHASH_EPOCH_LENGTH,
    ETHASH_EPOCH_LENGTH, ETHASH_MAX_EPOCH, HASH_BYTES, MIX_BYTES,
};
use crate::primitives::{keccak256, keccak512};

/// One 512-bit cache or dataset item as little-endian words.
pub type Node = [u32; 16];

const FNV_PRIME: u32 = 0x0100_0193;
const MIX_WORDS: usize = MIX_BYTES / 4;
const MIX_NODES: usize = MIX_BYTES / HASH_BYTES;

#[inline(always)]
pub(crate) fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(FNV_PRIME) ^ b
}

#[inline(always)]
fn fnv_node(mix: &mut Node, other: &Node) {
    for (m, o) in mix.iter_mut().zip(other) {
        *m = fnv(*m, *o);
    }
}

fn node_bytes(node: &Node) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (chunk, w) in out.chunks_exact_mut(4).zip(node) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

fn bytes_node(bytes: &[u8; 64]) -> Node {
    let mut node = [0u32; 16];
    for (w, v) in node.iter_mut().zip(words_u32(bytes)) {
        *w = v;
    }
    node
}

fn keccak512_node(node: &Node) -> Node {
    bytes_node(&keccak512(&node_bytes(node)))
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Cache size in bytes for `epoch`: the largest prime number of nodes that
/// fits under the linear growth curve.
pub fn cache_size(epoch: u64) -> u64 {
    let hash = HASH_BYTES as u64;
    let mut size = CACHE_BYTES_INIT + CACHE_BYTES_GROWTH * epoch - hash;
    while !is_prime(size / hash) {
        size -= 2 * hash;
    }
    size
}

/// Full dataset size in bytes for `epoch` (prime number of mix-sized pages).
pub fn dataset_size(epoch: u64) -> u64 {
    let mix = MIX_BYTES as u64;
    let mut size = DATASET_BYTES_INIT + DATASET_BYTES_GROWTH * epoch - mix;
    while !is_prime(size / mix) {
        size -= 2 * mix;
    }
    size
}

/// Seed hash for `epoch`: Keccak-256 iterated `epoch` times over 32 zero bytes.
pub fn seed_hash(epoch: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    for _ in 0..epoch {
        seed = keccak256(&seed);
    }
    seed
}

/// Recover the epoch a seed hash belongs to.
pub fn epoch_from_seed(seed: &[u8; 32]) -> Result<u64> {
    let mut candidate = [0u8; 32];
    for epoch in 0..ETHASH_MAX_EPOCH {
        if &candidate == seed {
            return Ok(epoch);
        }
        candidate = keccak256(&candidate);
    }
    Err(Error::UnsupportedEpoch {
        epoch: ETHASH_MAX_EPOCH,
        max: ETHASH_MAX_EPOCH - 1,
    })
}

fn check_epoch(epoch: u64) -> Result<u64> {
    if epoch >= ETHASH_MAX_EPOCH {
        return Err(Error::UnsupportedEpoch {
            epoch,
            max: ETHASH_MAX_EPOCH - 1,
        });
    }
    Ok(epoch)
}

/// Which epoch seeds the cache and which one sizes it.
///
/// For Ethash both are `height / 30000`. Etchash doubles the epoch length
/// after activation, so sizes follow the long epoch while the seed is the
/// matching short one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpochKey {
    pub seed_epoch: u64,
    pub size_epoch: u64,
}

impl EpochKey {
    pub fn ethash(height: u64) -> Result<Self> {
        Self::from_epoch(height / ETHASH_EPOCH_LENGTH)
    }

    pub fn from_epoch(epoch: u64) -> Result<Self> {
        let epoch = check_epoch(epoch)?;
        Ok(Self {
            seed_epoch: epoch,
            size_epoch: epoch,
        })
    }

    pub fn etchash(height: u64) -> Result<Self> {
        let length = if height >= ETCHASH_ACTIVATION_HEIGHT {
            ETCHASH_EPOCH_LENGTH
        } else {
            ETHASH_EPOCH_LENGTH
        };
        let size_epoch = check_epoch(height / length)?;
        let seed_epoch = check_epoch((size_epoch * length + 1) / ETHASH_EPOCH_LENGTH)?;
        Ok(Self {
            seed_epoch,
            size_epoch,
        })
    }
}

/// Light verification cache.
pub struct LightCache {
    key: EpochKey,
    seed: [u8; 32],
    nodes: Vec<Node>,
}

impl LightCache {
    pub fn build(key: EpochKey) -> Result<Self> {
        let seed = seed_hash(key.seed_epoch);
        let count = (cache_size(key.size_epoch) / HASH_BYTES as u64) as usize;
        let mut nodes: Vec<Node> = alloc_arena(count)?;

        nodes[0] = bytes_node(&keccak512(&seed));
        for i in 1..count {
            nodes[i] = keccak512_node(&nodes[i - 1]);
        }

        // RandMemoHash
        for _ in 0..CACHE_ROUNDS {
            for i in 0..count {
                let v = nodes[i][0] as usize % count;
                let mut mixed = nodes[(i + count - 1) % count];
                for (m, o) in mixed.iter_mut().zip(&nodes[v]) {
                    *m ^= *o;
                }
                nodes[i] = keccak512_node(&mixed);
            }
        }

        tracing::debug!(?key, nodes = count, "ethash cache built");
        Ok(Self { key, seed, nodes })
    }

    pub fn key(&self) -> EpochKey {
        self.key
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    pub fn size_bytes(&self) -> usize {
        self.nodes.len() * HASH_BYTES
    }

    pub fn dataset_size(&self) -> u64 {
        dataset_size(self.key.size_epoch)
    }

    /// Number of 64-byte items in the full dataset of this epoch.
    pub fn dataset_items(&self) -> u32 {
        (self.dataset_size() / HASH_BYTES as u64) as u32
    }

    pub fn as_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.nodes.iter().flat_map(|n| node_bytes(n))
    }

    /// Derive dataset item `index` from the cache.
    pub fn dataset_item(&self, index: u32) -> Node {
        let n = self.nodes.len();
        let mut mix = self.nodes[index as usize % n];
        mix[0] ^= index;
        mix = keccak512_node(&mix);
        for j in 0..DATASET_PARENTS {
            let parent = fnv(index ^ j, mix[j as usize % 16]) as usize % n;
            fnv_node(&mut mix, &self.nodes[parent]);
        }
        keccak512_node(&mix)
    }
}

/// Fully materialized dataset for fast hashing.
pub struct FullDataset {
    key: EpochKey,
    nodes: Vec<Node>,
}

impl FullDataset {
    pub fn build(cache: &LightCache) -> Result<Self> {
        let count = cache.dataset_items() as usize;
        let mut nodes: Vec<Node> = alloc_arena(count)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            nodes
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, node)| *node = cache.dataset_item(i as u32));
        }
        #[cfg(not(feature = "parallel"))]
        for (i, node) in nodes.iter_mut().enumerate() {
            *node = cache.dataset_item(i as u32);
        }

        tracing::debug!(key = ?cache.key(), items = count, "ethash dataset built");
        Ok(Self {
            key: cache.key(),
            nodes,
        })
    }

    pub fn key(&self) -> EpochKey {
        self.key
    }

    pub fn item(&self, index: u32) -> Node {
        self.nodes[index as usize]
    }

    pub fn items(&self) -> u32 {
        self.nodes.len() as u32
    }
}

/// Hashimoto result in natural byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthashOutput {
    pub result: [u8; 32],
    pub mix_hash: [u8; 32],
}

/// Core loop shared by the light and full paths. `lookup` returns dataset
/// item `index`; `items` is the dataset length in 64-byte items.
pub fn hashimoto<F>(header: &[u8; 32], nonce: u64, items: u32, lookup: F) -> EthashOutput
where
    F: Fn(u32) -> Node,
{
    let mut seed_input = [0u8; 40];
    seed_input[..32].copy_from_slice(header);
    seed_input[32..].copy_from_slice(&nonce.to_le_bytes());
    let seed = keccak512(&seed_input);
    let s = bytes_node(&seed);

    let mut mix = [0u32; MIX_WORDS];
    for (i, w) in mix.iter_mut().enumerate() {
        *w = s[i % 16];
    }

    let pages = items / MIX_NODES as u32;
    for i in 0..ACCESSES as u32 {
        let page = fnv(i ^ s[0], mix[i as usize % MIX_WORDS]) % pages;
        for n in 0..MIX_NODES {
            let item = lookup(page * MIX_NODES as u32 + n as u32);
            for (m, o) in mix[n * 16..(n + 1) * 16].iter_mut().zip(&item) {
                *m = fnv(*m, *o);
            }
        }
    }

    let mut mix_hash = [0u8; 32];
    for (out, quad) in mix_hash.chunks_exact_mut(4).zip(mix.chunks_exact(4)) {
        let word = fnv(fnv(fnv(quad[0], quad[1]), quad[2]), quad[3]);
        out.copy_from_slice(&word.to_le_bytes());
    }

    let mut final_input = [0u8; 96];
    final_input[..64].copy_from_slice(&seed);
    final_input[64..].copy_from_slice(&mix_hash);
    EthashOutput {
        result: keccak256(&final_input),
        mix_hash,
    }
}

pub fn hashimoto_light(cache: &LightCache, header: &[u8; 32], nonce: u64) -> EthashOutput {
    hashimoto(header, nonce, cache.dataset_items(), |i| {
        cache.dataset_item(i)
    })
}

pub fn hashimoto_full(dataset: &FullDataset, header: &[u8; 32], nonce: u64) -> EthashOutput {
    hashimoto(header, nonce, dataset.items(), |i| dataset.item(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_published_table() {
        assert_eq!(cache_size(0), 16_776_896);
        assert_eq!(cache_size(1), 16_907_456);
        assert_eq!(dataset_size(0), 1_073_739_904);
        assert_eq!(dataset_size(1), 1_082_130_304);
    }

    #[test]
    fn test_seed_hash_chain() {
        assert_eq!(seed_hash(0), [0u8; 32]);
        assert_eq!(
            hex::encode(seed_hash(1)),
            "290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
        assert_eq!(epoch_from_seed(&seed_hash(7)).unwrap(), 7);
    }

    #[test]
    fn test_unknown_seed_is_rejected() {
        let seed: [u8; 32] =
            hex::decode("4fffe9ae21f1c9e15207b1f472d5bbdd68c9595d461666602f2be20daf5e7843")
                .unwrap()
                .try_into()
                .unwrap();
        assert!(matches!(
            epoch_from_seed(&seed),
            Err(Error::UnsupportedEpoch { .. })
        ));
    }

    #[test]
    fn test_epoch_bounds() {
        assert_eq!(EpochKey::ethash(1_257_006).unwrap().size_epoch, 41);
        assert!(EpochKey::ethash(ETHASH_MAX_EPOCH * ETHASH_EPOCH_LENGTH).is_err());
    }

    #[test]
    fn test_etchash_epochs() {
        let before = EpochKey::etchash(11_699_999).unwrap();
        assert_eq!(before.seed_epoch, 389);
        assert_eq!(before.size_epoch, 389);

        let after = EpochKey::etchash(11_700_000).unwrap();
        assert_eq!(after.size_epoch, 195);
        assert_eq!(after.seed_epoch, 390);
    }

    #[test]
    fn test_light_mainnet_block() {
        let header: [u8; 32] =
            hex::decode("f5afa3074287b2b33e975468ae613e023e478112530bc19d4187693c13943445")
                .unwrap()
                .try_into()
                .unwrap();
        let nonce = u64::from_be_bytes(hex::decode("ff4136b6b6a244ec").unwrap().try_into().unwrap());
        let cache = LightCache::build(EpochKey::ethash(1_257_006).unwrap()).unwrap();
        let out = hashimoto_light(&cache, &header, nonce);
        assert_eq!(
            hex::encode(out.result),
            "0000000000095d18875acd4a2c2a5ff476c9acf283b4975d7af8d6c33d119c74"
        );
        assert_eq!(
            hex::encode(out.mix_hash),
            "47da5e47804594550791c24331163c1f1fde5bc622170e83515843b2b13dbe14"
        );
    }
}
