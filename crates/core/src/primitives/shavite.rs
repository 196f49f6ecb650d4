//! SHAvite-3 512: a 14-round Feistel network over four 128-bit lanes whose
//! F function is four keyless AES rounds.

use super::aes::aesenc;

const IV: [u32; 16] = [
    0x72fccdd8, 0x79ca4727, 0x128a077b, 0x40d55aec, 0xd1901a06, 0x430ae307, 0xb29f5cd1, 0xdf07fbfc,
    0x8e45d73d, 0x681ab538, 0xbde86578, 0xdd577e47, 0xe275eade, 0x502d9fcd, 0xb9357178, 0x022a4b9a,
];

const BLOCK: usize = 128;
const ROUND_KEYS: usize = 448;

/// Keyless AES round over four little-endian words.
fn aes_round(w: [u32; 4]) -> [u32; 4] {
    let mut block = [0u8; 16];
    for (c, x) in block.chunks_exact_mut(4).zip(w) {
        c.copy_from_slice(&x.to_le_bytes());
    }
    let out = aesenc(&block, &[0u8; 16]);
    let mut r = [0u32; 4];
    for (x, c) in r.iter_mut().zip(out.chunks_exact(4)) {
        *x = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
    }
    r
}

fn expand(block: &[u8], [c0, c1, c2, c3]: [u32; 4]) -> [u32; ROUND_KEYS] {
    let mut rk = [0u32; ROUND_KEYS];
    for (k, c) in rk.iter_mut().zip(block.chunks_exact(4)) {
        *k = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
    }

    let mut u = 32;
    loop {
        for _ in 0..8 {
            let x = aes_round([rk[u - 31], rk[u - 30], rk[u - 29], rk[u - 32]]);
            for i in 0..4 {
                rk[u + i] = x[i] ^ rk[u - 4 + i];
            }
            let counter = match u {
                32 => Some([c0, c1, c2, !c3]),
                164 => Some([c3, c2, c1, !c0]),
                316 => Some([c2, c3, c0, !c1]),
                440 => Some([c1, c0, c3, !c2]),
                _ => None,
            };
            if let Some(c) = counter {
                for i in 0..4 {
                    rk[u + i] ^= c[i];
                }
            }
            u += 4;
        }
        if u == ROUND_KEYS {
            break;
        }
        for _ in 0..8 {
            for i in 0..4 {
                rk[u + i] = rk[u - 32 + i] ^ rk[u - 7 + i];
            }
            u += 4;
        }
    }
    rk
}

fn compress(h: &mut [u32; 16], block: &[u8], counter: [u32; 4]) {
    let rk = expand(block, counter);
    let mut p = *h;
    let mut u = 0;
    for _ in 0..14 {
        for half in [0, 8] {
            let mut x = [0u32; 4];
            for i in 0..4 {
                x[i] = p[half + 4 + i] ^ rk[u + i];
            }
            u += 4;
            for _ in 0..3 {
                x = aes_round(x);
                for i in 0..4 {
                    x[i] ^= rk[u + i];
                }
                u += 4;
            }
            x = aes_round(x);
            for i in 0..4 {
                p[half + i] ^= x[i];
            }
        }
        for i in 0..4 {
            (p[i], p[4 + i], p[8 + i], p[12 + i]) = (p[12 + i], p[i], p[4 + i], p[8 + i]);
        }
    }
    for (a, b) in h.iter_mut().zip(p) {
        *a ^= b;
    }
}

fn counter_words(bits: u128) -> [u32; 4] {
    [0, 32, 64, 96].map(|s| (bits >> s) as u32)
}

pub fn shavite512(data: &[u8]) -> [u8; 64] {
    let mut h = IV;
    let mut bits: u128 = 0;
    let mut blocks = data.chunks_exact(BLOCK);
    for block in &mut blocks {
        bits += 1024;
        compress(&mut h, block, counter_words(bits));
    }
    let tail = blocks.remainder();
    bits += tail.len() as u128 * 8;
    let count = counter_words(bits);

    // Bit count at bytes 110..126, then the digest size in bits.
    let mut trailer = [0u8; 18];
    for (c, w) in trailer.chunks_exact_mut(4).zip(count) {
        c.copy_from_slice(&w.to_le_bytes());
    }
    trailer[16..].copy_from_slice(&512u16.to_le_bytes());

    let mut last = [0u8; BLOCK];
    last[..tail.len()].copy_from_slice(tail);
    last[tail.len()] = 0x80;
    if tail.len() < BLOCK - trailer.len() {
        last[BLOCK - trailer.len()..].copy_from_slice(&trailer);
        // A block holding only padding carries a zero counter.
        let counter = if tail.is_empty() { [0; 4] } else { count };
        compress(&mut h, &last, counter);
    } else {
        compress(&mut h, &last, count);
        let mut extra = [0u8; BLOCK];
        extra[BLOCK - trailer.len()..].copy_from_slice(&trailer);
        compress(&mut h, &extra, [0; 4]);
    }

    let mut out = [0u8; 64];
    for (c, w) in out.chunks_exact_mut(4).zip(h) {
        c.copy_from_slice(&w.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn test_shavite512_vectors() {
        assert_eq!(
            hex::encode(shavite512(b"")),
            "a485c1b2578459d1efc5dddd840bb0b4a650ac82fe68f58c4442ccda747da006\
             b2d1dc6b4a4eb7d84ff91e1f466fef429d259acd995dddcad16fa545c7a6e5ba"
        );
        assert_eq!(
            hex::encode(shavite512(b"abc")),
            "0fb0b216b377e6d95db1b6d9b6c8b59f08d4e29814071c8c0f827b32e68c1536\
             2f24bcc15ad6b1c925a03f00092997f7628cb47f27c9ad7a22e4c00fbb2c16e3"
        );
    }

    #[test]
    fn test_shavite512_chain_input() {
        assert_eq!(
            hex::encode(shavite512(&sequence(64))),
            "4b53734538b113c1637104887e9f2150fa4ad9ec70552d8ed62f0134a47a2f4e\
             8134b2366932983b4127cbcba59cda04bf6d0005b5ba04dea92879f15e80a28a"
        );
        assert_eq!(
            hex::encode(shavite512(&sequence(80))),
            "34e661840d411f32b5f07c638df53bc082319c5940c80bea383f1649a42ff60d\
             2c4de8e0efa2fd6214915415b58cf5a4d85cb287e5a455096513c94a8d48971b"
        );
    }

    #[test]
    fn test_shavite512_spills_trailer_into_extra_block() {
        assert_eq!(
            hex::encode(shavite512(&sequence(200))),
            "c312d285cd9c597d7df9525133155f05aa94f206b31e2def255879b8bb27f25c\
             cfaba516238c5de679545e7d0d88a5d0c0c975aae8a2e62369fcdeda4d02da42"
        );
        assert_eq!(
            hex::encode(shavite512(&sequence(120))),
            "d1e7be8e066ccefbf620efa8f00458ba350fc4bb57bf16ec87daf8de56a45c57\
             230186580d29522edde589d1dff4e36f9f4da38cac7684ad58b2038b37d92677"
        );
        assert_eq!(
            hex::encode(shavite512(&sequence(240))),
            "c8c5dfbf17d8dbac68780cd7291380d550c198e59bc703727b9077b9d04c1de5\
             95515844ab497eeadbddbd2313320f402300e23b3eecb361ed0952ee341397bb"
        );
    }
}
