//! SIMD-512: a number-theoretic transform of the message block expanded into
//! 64-word round inputs for a four-round, eight-lane Davies-Meyer network.

const IV: [u32; 32] = [
    0x0ba16b95, 0x72f999ad, 0x9fecc2ae, 0xba3264fc, 0x5e894929, 0x8e9f30e5, 0x2f1daa37, 0xf0f2c558,
    0xac506643, 0xa90635a5, 0xe25b878b, 0xaab7878f, 0x88817f7a, 0x0a02892b, 0x559a7550, 0x598f657e,
    0x7eef60a1, 0x6b70e3e8, 0x9c1714d1, 0xb958e2a8, 0xab02675e, 0xed1c014f, 0xcd8d65bb, 0xfdb7a257,
    0x09254899, 0xd699c7bc, 0x9019b6dc, 0x2b9022e4, 0x8fa14956, 0x21bf9bd3, 0xb94d0943, 0x6ffddc22,
];

const BLOCK: usize = 128;
const P: i32 = 257;

const fn powers(base: i32) -> [i32; 256] {
    let mut table = [0; 256];
    let mut v = 1;
    let mut i = 0;
    while i < 256 {
        table[i] = v;
        v = v * base % P;
        i += 1;
    }
    table
}

/// Powers of 41, a 256th root of unity mod 257.
const ALPHA: [i32; 256] = powers(41);
/// Offsets added to the transform of every block but the last.
const OFFSET: [i32; 256] = powers(163);
/// Extra offsets added to the transform of the length block.
const FINAL_OFFSET: [i32; 256] = powers(40);

/// Message block order for the 32 eight-word steps.
const WORD_GROUPS: [usize; 32] = [
    4, 6, 0, 2, 7, 5, 3, 1, 15, 11, 12, 8, 9, 13, 10, 14, 17, 18, 23, 20, 22, 21, 16, 19, 30, 24,
    25, 31, 27, 29, 28, 26,
];
/// Lane permutation masks, indexed by round plus step.
const PERMUTATIONS: [usize; 11] = [1, 6, 2, 3, 5, 7, 4, 1, 6, 2, 3];

/// Per round: the two transform offsets, the multiplier, and the rotations.
const ROUNDS: [(isize, isize, i32, [u32; 4]); 4] = [
    (0, 1, 185, [3, 23, 17, 27]),
    (0, 1, 185, [28, 19, 22, 7]),
    (-256, -128, 233, [29, 9, 15, 5]),
    (-383, -255, 233, [4, 13, 10, 25]),
];

/// 256-point transform of the block zero-extended to 256 bytes, in
/// natural order with entries in `0..257`.
fn ntt(block: &[u8]) -> [i32; 256] {
    let mut a = [0i32; 256];
    for (i, &b) in block.iter().enumerate() {
        a[(i as u8).reverse_bits() as usize] = i32::from(b);
    }
    let mut len = 2;
    while len <= 256 {
        let half = len / 2;
        let stride = 256 / len;
        for start in (0..256).step_by(len) {
            for k in 0..half {
                let even = a[start + k];
                let odd = a[start + k + half] * ALPHA[k * stride] % P;
                a[start + k] = (even + odd) % P;
                a[start + k + half] = (even - odd + P) % P;
            }
        }
        len *= 2;
    }
    a
}

fn if_(x: u32, y: u32, z: u32) -> u32 {
    ((y ^ z) & x) ^ z
}

fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | ((x | y) & z)
}

/// One step across all eight lanes. State is laid out as A, B, C, D rows
/// of eight words.
fn step(s: &mut [u32; 32], w: &[u32], f: fn(u32, u32, u32) -> u32, r: u32, t: u32, perm: usize) {
    let mut rotated = [0u32; 8];
    for (x, a) in rotated.iter_mut().zip(&s[..8]) {
        *x = a.rotate_left(r);
    }
    for n in 0..8 {
        let (a, b, c, d) = (s[n], s[8 + n], s[16 + n], s[24 + n]);
        let tt = d.wrapping_add(w[n]).wrapping_add(f(a, b, c));
        s[n] = tt.rotate_left(t).wrapping_add(rotated[perm ^ n]);
        s[24 + n] = c;
        s[16 + n] = b;
        s[8 + n] = rotated[n];
    }
}

fn compress(h: &mut [u32; 32], block: &[u8], last: bool) {
    let y = ntt(block);
    let mut q = [0i32; 256];
    for (i, v) in q.iter_mut().enumerate() {
        let mut t = y[i] + OFFSET[i];
        if last {
            t += FINAL_OFFSET[i];
        }
        t %= P;
        *v = if t <= 128 { t } else { t - P };
    }

    let mut s = *h;
    for (x, c) in s.iter_mut().zip(block.chunks_exact(4)) {
        *x ^= u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
    }

    let mut w = [0u32; 64];
    for (round, &(o1, o2, mul, rot)) in ROUNDS.iter().enumerate() {
        for (u, group) in w.chunks_exact_mut(8).enumerate() {
            let base = (WORD_GROUPS[8 * round + u] << 4) as isize;
            for (k, x) in group.iter_mut().enumerate() {
                let lo = q[(base + 2 * k as isize + o1) as usize] * mul;
                let hi = q[(base + 2 * k as isize + o2) as usize] * mul;
                *x = (lo as u32 & 0xffff).wrapping_add((hi as u32) << 16);
            }
        }
        for (i, group) in w.chunks_exact(8).enumerate() {
            let f = if i < 4 { if_ } else { maj };
            step(&mut s, group, f, rot[i % 4], rot[(i + 1) % 4], PERMUTATIONS[round + i]);
        }
    }

    let old = *h;
    for (i, (r, t, perm)) in [(4, 13, 5), (13, 10, 7), (10, 25, 4), (25, 4, 1)]
        .into_iter()
        .enumerate()
    {
        step(&mut s, &old[8 * i..8 * i + 8], if_, r, t, perm);
    }
    *h = s;
}

pub fn simd512(data: &[u8]) -> [u8; 64] {
    let mut h = IV;
    let mut blocks = data.chunks_exact(BLOCK);
    for block in &mut blocks {
        compress(&mut h, block, false);
    }
    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut last = [0u8; BLOCK];
        last[..tail.len()].copy_from_slice(tail);
        compress(&mut h, &last, false);
    }

    let bits = (data.len() as u64).wrapping_mul(8);
    let mut length = [0u8; BLOCK];
    length[..8].copy_from_slice(&bits.to_le_bytes());
    compress(&mut h, &length, true);

    let mut out = [0u8; 64];
    for (c, w) in out.chunks_exact_mut(4).zip(h) {
        c.copy_from_slice(&w.to_le_bytes());
    }
    out
}
