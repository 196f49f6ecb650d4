//! AstroBWT: Salsa20 keystreams run through a Burrows-Wheeler style suffix
//! sort.
//!
//! v1 (DERO) sorts two keystreams, the second one sized by the hash of the
//! first. v2 (DERO HE) sorts one short keystream and hashes the suffix
//! order itself.

use core::cmp::Ordering;

use salsa20::Salsa20;
use salsa20::cipher::{KeyIvInit, StreamCipher};

use crate::codec::{alloc_arena, read_u32_le};
use crate::error::{Error, Result};
use crate::params::{ASTROBWT_STAGE1_LENGTH, ASTROBWT_STAGE2_MASK, ASTROBWT_V2_LENGTH};
use crate::primitives::sha3_256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstroBwtVariant {
    /// Two-stage BWT over ~147 KiB and up to ~1.1 MiB
    Dero,
    /// Single 9973-byte stage, hashes the suffix array
    DeroHe,
}

impl AstroBwtVariant {
    /// Mode selector: 0 v1, 1 v2.
    pub fn from_id(id: u64) -> Result<Self> {
        match id {
            0 => Ok(Self::Dero),
            1 => Ok(Self::DeroHe),
            _ => Err(Error::variant("astrobwt", id)),
        }
    }
}

fn keystream(key: &[u8; 32], len: usize) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = alloc_arena(len)?;
    let mut cipher = Salsa20::new(&(*key).into(), &[0u8; 8].into());
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

/// First eight bytes of the suffix at `i`, zero-extended past the end.
#[inline]
fn prefix_key(text: &[u8], i: usize) -> u64 {
    let mut word = [0u8; 8];
    let tail = &text[i.min(text.len())..];
    let n = tail.len().min(8);
    word[..n].copy_from_slice(&tail[..n]);
    u64::from_be_bytes(word)
}

/// Compare two suffixes as if the text were followed by infinite zeros.
fn cmp_suffix(text: &[u8], a: usize, b: usize) -> Ordering {
    let sa = &text[a.min(text.len())..];
    let sb = &text[b.min(text.len())..];
    let common = sa.len().min(sb.len());
    match sa[..common].cmp(&sb[..common]) {
        Ordering::Equal => {
            let (rest, longer_is_a) = if sa.len() > common {
                (&sa[common..], true)
            } else {
                (&sb[common..], false)
            };
            match (rest.iter().any(|&x| x != 0), longer_is_a) {
                (false, _) => Ordering::Equal,
                (true, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
            }
        }
        ord => ord,
    }
}

/// Suffix start positions `0..count` in sorted order. Equal suffixes keep
/// ascending position order.
fn sort_suffixes(text: &[u8], count: usize) -> Result<Vec<u32>> {
    let mut keyed: Vec<(u64, u32)> = alloc_arena(count)?;
    for (i, slot) in keyed.iter_mut().enumerate() {
        *slot = (prefix_key(text, i), i as u32);
    }
    keyed.sort_unstable_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| cmp_suffix(text, a.1 as usize + 8, b.1 as usize + 8))
            .then(a.1.cmp(&b.1))
    });
    Ok(keyed.into_iter().map(|(_, i)| i).collect())
}

/// BWT including the empty suffix; the byte preceding position 0 reads as 0.
fn bwt(text: &[u8]) -> Result<Vec<u8>> {
    let order = sort_suffixes(text, text.len() + 1)?;
    Ok(order
        .into_iter()
        .map(|i| match i {
            0 => 0,
            i => text[i as usize - 1],
        })
        .collect())
}

fn hash_v1(input: &[u8]) -> Result<[u8; 32]> {
    let key = sha3_256(input);
    let stage1 = keystream(&key, ASTROBWT_STAGE1_LENGTH)?;
    let key = sha3_256(&bwt(&stage1)?);

    let stage2_len =
        ASTROBWT_STAGE1_LENGTH + (read_u32_le(&key, 0) & ASTROBWT_STAGE2_MASK) as usize;
    tracing::trace!(stage2_len, "astrobwt stage 2");
    let stage2 = keystream(&key, stage2_len)?;
    Ok(sha3_256(&bwt(&stage2)?))
}

fn hash_v2(input: &[u8]) -> Result<[u8; 32]> {
    let key = sha3_256(input);
    let text = keystream(&key, ASTROBWT_V2_LENGTH)?;
    let order = sort_suffixes(&text, text.len())?;
    let packed: Vec<u8> = order
        .iter()
        .flat_map(|&i| (i as u16).to_le_bytes())
        .collect();
    Ok(sha3_256(&packed))
}

pub fn astrobwt(input: &[u8], variant: AstroBwtVariant) -> Result<[u8; 32]> {
    match variant {
        AstroBwtVariant::Dero => hash_v1(input),
        AstroBwtVariant::DeroHe => hash_v2(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "0305a0dbd6bf05cf16e503f3a66f78007cbf34144332ecbfc22ed95c8700383b309ace1923a0964b00000008ba939a62724c0d7581fce5761e9d8a0e6a1c3f924fdd8493d1115649c05eb601";

    #[test]
    fn test_mode_selector() {
        assert_eq!(AstroBwtVariant::from_id(1).unwrap(), AstroBwtVariant::DeroHe);
        assert_eq!(
            AstroBwtVariant::from_id(2).unwrap_err(),
            Error::variant("astrobwt", 2u64)
        );
    }

    #[test]
    fn test_keystream_matches_estream_vector() {
        let mut key = [0u8; 32];
        key[0] = 0x80;
        let ks = keystream(&key, 8).unwrap();
        assert_eq!(hex::encode(ks), "e3be8fdd8beca2e3");
    }

    #[test]
    fn test_suffix_sort_small() {
        // "banana" plus the empty suffix
        let order = sort_suffixes(b"banana", 7).unwrap();
        assert_eq!(order, vec![6, 5, 3, 1, 0, 4, 2]);
        assert_eq!(bwt(b"banana").unwrap(), b"annb\0aa".to_vec());
    }

    #[test]
    fn test_zero_padding_ties_keep_position_order() {
        // "\0" and the empty suffix compare equal once zero-extended.
        let order = sort_suffixes(b"a\0", 3).unwrap();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_dero_block_blob() {
        let input = hex::decode(BLOB).unwrap();
        assert_eq!(
            hex::encode(astrobwt(&input, AstroBwtVariant::Dero).unwrap()),
            "7e8844f2d6b7a43498fe6d226527689023da8a52f9fc4ec69e5aaaa63edce1c1"
        );
    }

    #[test]
    fn test_dero_he_block_blob() {
        let input = hex::decode(BLOB).unwrap();
        assert_eq!(
            hex::encode(astrobwt(&input, AstroBwtVariant::DeroHe).unwrap()),
            "489ed2661427986503fb8725e1d398da27ee253db4378798bf5a5c94ee0ce22a"
        );
    }

    // xmrig's AstroBWT self-test gives 7e8844f2... for this blob, as asserted above.
    #[test]
    #[ignore = "expected value from a pool test that never asserted it; does not match the reference miner output"]
    fn test_pool_vector_mode0() {
        let input = hex::decode(BLOB).unwrap();
        assert_eq!(
            hex::encode(astrobwt(&input, AstroBwtVariant::Dero).unwrap()),
            "3c1f6d871c8571ae74cce3c6ff7d11ed7f5848c19a26d9c5972869cfabc449a8"
        );
    }
}
