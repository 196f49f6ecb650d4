//! CubeHash16/32-512.

const ROUNDS: usize = 16;

fn round(x: &mut [u32; 32]) {
    for i in 0..16 {
        x[i + 16] = x[i + 16].wrapping_add(x[i]);
        x[i] = x[i].rotate_left(7);
    }
    for i in 0..8 {
        x.swap(i, i + 8);
    }
    for i in 0..16 {
        x[i] ^= x[i + 16];
    }
    for i in (16..32).filter(|i| i & 2 == 0) {
        x.swap(i, i ^ 2);
    }
    for i in 0..16 {
        x[i + 16] = x[i + 16].wrapping_add(x[i]);
        x[i] = x[i].rotate_left(11);
    }
    for i in (0..16).filter(|i| i & 4 == 0) {
        x.swap(i, i ^ 4);
    }
    for i in 0..16 {
        x[i] ^= x[i + 16];
    }
    for i in (16..32).step_by(2) {
        x.swap(i, i + 1);
    }
}

pub fn cubehash512(data: &[u8]) -> [u8; 64] {
    let mut x = [0u32; 32];
    x[0] = 64;
    x[1] = 32;
    x[2] = ROUNDS as u32;
    for _ in 0..10 * ROUNDS {
        round(&mut x);
    }

    let mut msg = data.to_vec();
    msg.push(0x80);
    msg.resize(msg.len().div_ceil(32) * 32, 0);
    for block in msg.chunks_exact(32) {
        for (w, c) in x.iter_mut().zip(block.chunks_exact(4)) {
            *w ^= u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        }
        for _ in 0..ROUNDS {
            round(&mut x);
        }
    }

    x[31] ^= 1;
    for _ in 0..10 * ROUNDS {
        round(&mut x);
    }

    let mut out = [0u8; 64];
    for (c, w) in out.chunks_exact_mut(4).zip(x) {
        c.copy_from_slice(&w.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubehash512_empty() {
        assert_eq!(
            hex::encode(cubehash512(b"")),
            "4a1d00bbcfcb5a9562fb981e7f7db3350fe2658639d948b9d57452c22328bb32\
             f468b072208450bad5ee178271408be0b16e5633ac8a1e3cf9864cfbfc8e043a"
        );
    }
}
