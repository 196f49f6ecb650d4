//! CryptoNight scratchpad hashing and the variants built on it.
//!
//! Every variant follows the same three phases over an arena of 16-byte
//! blocks: explode the Keccak state into the scratchpad with AES rounds,
//! run the read/modify/write main loop, then implode the scratchpad back
//! into the state and pick one of four finalizers from its first byte.
//! Variants differ in scratchpad size, iteration count and the per-step
//! tweaks applied in the main loop.

mod ghostrider;
mod random_math;

pub use ghostrider::{CoreHash, ghostrider, ghostrider_with};

use crate::codec::{alloc_arena, read_u64_le};
use crate::error::{Error, Result};
use crate::primitives::aes::{SBOX, aesenc, expand_key_256};
use crate::primitives::keccak::{keccak_state, keccakf1600, state_bytes, state_from_bytes};
use crate::primitives::{blake256, groestl256, jh256, skein512_256};

use random_math::RandomMath;

type Block = [u8; 16];

/// Bytes of input required by the v1 tweak (it reads bytes 35..43).
const V1_MIN_INPUT: usize = 43;

/// CryptoNight family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CnVariant {
    Zero,
    One,
    Fast,
    Xao,
    Rto,
    Two,
    Half,
    R,
    Rwz,
    Zls,
    Double,
    Ccx,
    Lite0,
    Lite1,
    Heavy0,
    HeavyXhv,
    HeavyTube,
    Pico,
    /// Ghostrider scratchpad steps (dark, dark-lite, fast, lite, turtle,
    /// turtle-lite)
    Gr0,
    Gr1,
    Gr2,
    Gr3,
    Gr4,
    Gr5,
}

/// How the main loop mixes its registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    /// Plain AES + multiply
    V0,
    /// Adds the per-input tweak to stored words
    V1,
    /// Shuffles neighbouring blocks and adds integer division/sqrt (or the
    /// random program for cn/r)
    V2,
}

#[derive(Debug, Clone, Copy)]
struct Params {
    memory: usize,
    iterations: usize,
    mask: u64,
    base: Base,
    random_math: bool,
    heavy: bool,
    xhv: bool,
    tube: bool,
    rto: bool,
    reverse_shuffle: bool,
    conceal: bool,
}

impl Params {
    const fn new(memory: usize, iterations: usize, mask: u64, base: Base) -> Self {
        Self {
            memory,
            iterations,
            mask,
            base,
            random_math: false,
            heavy: false,
            xhv: false,
            tube: false,
            rto: false,
            reverse_shuffle: false,
            conceal: false,
        }
    }
}

const MIB: usize = 1 << 20;
const KIB: usize = 1 << 10;

impl CnVariant {
    /// Ids accepted by `cryptonight(input, id, height)`. Id 18 (Ghostrider)
    /// is a chain rather than a single variant and is dispatched separately.
    pub fn classic(id: u32) -> Result<Self> {
        Ok(match id {
            0 => Self::Zero,
            1 => Self::One,
            4 => Self::Fast,
            6 => Self::Xao,
            7 => Self::Rto,
            8 => Self::Two,
            9 => Self::Half,
            13 => Self::R,
            14 => Self::Rwz,
            15 => Self::Zls,
            16 => Self::Double,
            17 => Self::Ccx,
            // 11 is cn/gpu, whose float inner loop has no vector to check a port against.
            other => return Err(Error::variant("cryptonight", other)),
        })
    }

    pub fn light(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Lite0),
            1 => Ok(Self::Lite1),
            other => Err(Error::variant("cryptonight_light", other)),
        }
    }

    pub fn heavy(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Heavy0),
            1 => Ok(Self::HeavyXhv),
            2 => Ok(Self::HeavyTube),
            other => Err(Error::variant("cryptonight_heavy", other)),
        }
    }

    pub fn pico(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Pico),
            other => Err(Error::variant("cryptonight_pico", other)),
        }
    }

    pub const GHOSTRIDER: [CnVariant; 6] = [
        Self::Gr0,
        Self::Gr1,
        Self::Gr2,
        Self::Gr3,
        Self::Gr4,
        Self::Gr5,
    ];

    /// Scratchpad size in bytes.
    pub fn memory(self) -> usize {
        self.params().memory
    }

    /// Whether the block height feeds the hash.
    pub fn uses_height(self) -> bool {
        self.params().random_math
    }

    fn params(self) -> Params {
        use Base::*;
        const MASK_2M: u64 = 0x1f_fff0;
        match self {
            Self::Zero => Params::new(2 * MIB, 0x80000, MASK_2M, V0),
            Self::One => Params::new(2 * MIB, 0x80000, MASK_2M, V1),
            Self::Fast => Params::new(2 * MIB, 0x40000, MASK_2M, V1),
            Self::Xao => Params::new(2 * MIB, 0x100000, MASK_2M, V0),
            Self::Rto => Params {
                rto: true,
                ..Params::new(2 * MIB, 0x80000, MASK_2M, V1)
            },
            Self::Two => Params::new(2 * MIB, 0x80000, MASK_2M, V2),
            Self::Half => Params::new(2 * MIB, 0x40000, MASK_2M, V2),
            Self::R => Params {
                random_math: true,
                ..Params::new(2 * MIB, 0x80000, MASK_2M, V2)
            },
            Self::Rwz => Params {
                reverse_shuffle: true,
                ..Params::new(2 * MIB, 0x60000, MASK_2M, V2)
            },
            Self::Zls => Params::new(2 * MIB, 0x60000, MASK_2M, V2),
            Self::Double => Params::new(2 * MIB, 0x100000, MASK_2M, V2),
            Self::Ccx => Params {
                conceal: true,
                ..Params::new(2 * MIB, 0x40000, MASK_2M, V0)
            },
            Self::Lite0 => Params::new(MIB, 0x40000, 0xf_fff0, V0),
            Self::Lite1 => Params::new(MIB, 0x40000, 0xf_fff0, V1),
            Self::Heavy0 => Params {
                heavy: true,
                ..Params::new(4 * MIB, 0x40000, 0x3f_fff0, V0)
            },
            Self::HeavyXhv => Params {
                heavy: true,
                xhv: true,
                ..Params::new(4 * MIB, 0x40000, 0x3f_fff0, V0)
            },
            Self::HeavyTube => Params {
                heavy: true,
                tube: true,
                ..Params::new(4 * MIB, 0x40000, 0x3f_fff0, V1)
            },
            Self::Pico => Params::new(256 * KIB, 0x10000, 0x3_fff0, V2),
            Self::Gr0 => Params::new(512 * KIB, 0x20000, 0x7_fff0, V1),
            Self::Gr1 => Params::new(512 * KIB, 0x20000, 0x3_fff0, V1),
            Self::Gr2 => Params::new(MIB, 0x40000, 0xf_fff0, V1),
            Self::Gr3 => Params::new(MIB, 0x20000, 0xf_fff0, V1),
            Self::Gr4 => Params::new(256 * KIB, 0x10000, 0x3_fff0, V1),
            Self::Gr5 => Params::new(256 * KIB, 0x10000, 0x1_fff0, V1),
        }
    }
}

/// Reusable CryptoNight hasher.
///
/// Owns the scratchpad arena so repeated hashes (and the Ghostrider chain,
/// which runs three variants back to back) allocate once.
pub struct CryptoNight {
    scratchpad: Vec<Block>,
}

impl CryptoNight {
    /// Allocate a scratchpad large enough for `variant`.
    pub fn new(variant: CnVariant) -> Result<Self> {
        Self::with_capacity(variant.memory())
    }

    pub fn with_capacity(bytes: usize) -> Result<Self> {
        Ok(Self {
            scratchpad: alloc_arena(bytes / 16)?,
        })
    }

    /// Hash `input`. `height` only matters for cn/r.
    pub fn hash(&mut self, input: &[u8], variant: CnVariant, height: u64) -> Result<[u8; 32]> {
        let params = variant.params();
        if params.base == Base::V1 && input.len() < V1_MIN_INPUT {
            return Err(Error::length("cryptonight input", V1_MIN_INPUT, input.len()));
        }

        let blocks = params.memory / 16;
        if self.scratchpad.len() < blocks {
            self.scratchpad = alloc_arena(blocks)?;
        }
        let pad = &mut self.scratchpad[..blocks];

        let mut state = keccak_state(input);
        explode(&state, pad, params.heavy);
        main_loop(&state, pad, &params, input, height);
        implode(&mut state, pad, params.heavy);

        let mut words = state_from_bytes(&state);
        keccakf1600(&mut words);
        Ok(finalize(&state_bytes(&words)))
    }
}

/// One-shot hash with a freshly allocated scratchpad.
pub fn cryptonight(input: &[u8], variant: CnVariant, height: u64) -> Result<[u8; 32]> {
    CryptoNight::new(variant)?.hash(input, variant, height)
}

fn finalize(state: &[u8; 200]) -> [u8; 32] {
    match state[0] & 3 {
        0 => blake256(state),
        1 => groestl256(state),
        2 => jh256(state),
        _ => skein512_256(state),
    }
}

#[inline(always)]
fn lo(b: &Block) -> u64 {
    read_u64_le(b, 0)
}

#[inline(always)]
fn hi(b: &Block) -> u64 {
    read_u64_le(b, 8)
}

#[inline(always)]
fn block(lo: u64, hi: u64) -> Block {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&lo.to_le_bytes());
    out[8..].copy_from_slice(&hi.to_le_bytes());
    out
}

#[inline(always)]
fn xor(a: &Block, b: &Block) -> Block {
    core::array::from_fn(|i| a[i] ^ b[i])
}

#[inline(always)]
fn add_lanes(a: &Block, b: &Block) -> Block {
    block(lo(a).wrapping_add(lo(b)), hi(a).wrapping_add(hi(b)))
}

#[inline(always)]
fn aes_rounds(x: &mut [Block; 8], keys: &[Block; 10]) {
    for b in x.iter_mut() {
        for key in keys {
            *b = aesenc(b, key);
        }
    }
}

/// Heavy variants fold each block into its neighbour after every pass.
fn mix_and_propagate(x: &mut [Block; 8]) {
    let first = x[0];
    for i in 0..7 {
        x[i] = xor(&x[i], &x[i + 1]);
    }
    x[7] = xor(&x[7], &first);
}

fn state_blocks(state: &[u8; 200]) -> [Block; 8] {
    core::array::from_fn(|i| {
        let mut b = [0u8; 16];
        b.copy_from_slice(&state[64 + i * 16..80 + i * 16]);
        b
    })
}

fn round_keys(state: &[u8; 200], offset: usize) -> [Block; 10] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&state[offset..offset + 32]);
    expand_key_256(&key)
}

fn explode(state: &[u8; 200], pad: &mut [Block], heavy: bool) {
    let keys = round_keys(state, 0);
    let mut x = state_blocks(state);

    if heavy {
        for _ in 0..16 {
            aes_rounds(&mut x, &keys);
            mix_and_propagate(&mut x);
        }
    }

    for chunk in pad.chunks_exact_mut(8) {
        aes_rounds(&mut x, &keys);
        chunk.copy_from_slice(&x);
    }
}

fn implode(state: &mut [u8; 200], pad: &[Block], heavy: bool) {
    let keys = round_keys(state, 32);
    let mut x = state_blocks(state);

    let absorb = |x: &mut [Block; 8]| {
        for chunk in pad.chunks_exact(8) {
            for (xi, m) in x.iter_mut().zip(chunk) {
                *xi = xor(xi, m);
            }
            aes_rounds(x, &keys);
            if heavy {
                mix_and_propagate(x);
            }
        }
    };

    absorb(&mut x);
    if heavy {
        absorb(&mut x);
        for _ in 0..16 {
            aes_rounds(&mut x, &keys);
            mix_and_propagate(&mut x);
        }
    }

    for (i, b) in x.iter().enumerate() {
        state[64 + i * 16..80 + i * 16].copy_from_slice(b);
    }
}

/// Scratchpad block index for a 64-bit address.
#[inline(always)]
fn slot(address: u64, mask: u64) -> usize {
    ((address & mask) >> 4) as usize
}

/// v1: flip two bits of byte 11 chosen by its own value.
#[inline(always)]
fn v1_tweak(mut b: Block) -> Block {
    let x = b[11];
    let index = (((x >> 3) & 6) | (x & 1)) << 1;
    b[11] = x ^ ((0x75310u32 >> index) & 0x30) as u8;
    b
}

/// v2 shuffle: rotate the three sibling blocks of a 64-byte line while
/// adding the carried registers. Returns the xor of the siblings as read.
fn shuffle(
    pad: &mut [Block],
    j: usize,
    a: &Block,
    b0: &Block,
    b1: &Block,
    reverse: bool,
) -> Block {
    let (first, third) = if reverse { (3, 1) } else { (1, 3) };
    let c1 = pad[j ^ first];
    let c2 = pad[j ^ 2];
    let c3 = pad[j ^ third];
    pad[j ^ 1] = add_lanes(&c3, b1);
    pad[j ^ 2] = add_lanes(&c1, b0);
    pad[j ^ 3] = add_lanes(&c2, a);
    xor(&xor(&c1, &c2), &c3)
}

/// Integer square root in the fixed-point form used by v2:
/// `floor(2 * sqrt(2^64 + input)) - 2^33`.
fn sqrt_fixed(input: u64) -> u64 {
    let root = (input as f64 + 18_446_744_073_709_551_616.0).sqrt();
    let mut r = (root * 2.0 - 8_589_934_592.0) as u64;
    let s = r >> 1;
    let b = r & 1;
    let r2 = s.wrapping_mul(s + b).wrapping_add(r << 32);
    let too_big = r2.wrapping_add(b) > input;
    let too_small = r2.wrapping_add(1 << 32) < input.wrapping_sub(s);
    if too_big {
        r = r.wrapping_sub(1);
    }
    if too_small {
        r = r.wrapping_add(1);
    }
    r
}

/// AES round with the table lookups Bittube uses: the input is inverted
/// and each column's output feeds the next column's input.
fn tube_round(cx: &Block, key: &Block) -> Block {
    fn xt(v: u8) -> u8 {
        (v << 1) ^ if v & 0x80 != 0 { 0x1b } else { 0 }
    }

    fn column(a0: u8, a1: u8, a2: u8, a3: u8) -> u32 {
        let [s0, s1, s2, s3] = [a0, a1, a2, a3].map(|a| SBOX[a as usize]);
        u32::from_le_bytes([
            xt(s0) ^ xt(s1) ^ s1 ^ s2 ^ s3,
            s0 ^ xt(s1) ^ xt(s2) ^ s2 ^ s3,
            s0 ^ s1 ^ xt(s2) ^ xt(s3) ^ s3,
            xt(s0) ^ s0 ^ s1 ^ s2 ^ xt(s3),
        ])
    }

    let word = |b: &Block, i: usize| {
        u32::from_le_bytes([b[4 * i], b[4 * i + 1], b[4 * i + 2], b[4 * i + 3]])
    };
    let byte = |w: u32, i: usize| (w >> (8 * i)) as u8;

    let mut x: [u32; 4] = core::array::from_fn(|i| !word(cx, i));
    let mut k: [u32; 4] = core::array::from_fn(|i| word(key, i));

    k[0] ^= column(byte(x[0], 0), byte(x[1], 1), byte(x[2], 2), byte(x[3], 3));
    x[0] ^= k[0];
    k[1] ^= column(byte(x[1], 0), byte(x[2], 1), byte(x[3], 2), byte(x[0], 3));
    x[1] ^= k[1];
    k[2] ^= column(byte(x[2], 0), byte(x[3], 1), byte(x[0], 2), byte(x[1], 3));
    x[2] ^= k[2];
    k[3] ^= column(byte(x[3], 0), byte(x[0], 1), byte(x[1], 2), byte(x[2], 3));

    let mut out = [0u8; 16];
    for (chunk, w) in out.chunks_exact_mut(4).zip(k) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

/// Conceal (ccx): float feedback folded into the block before the AES round.
fn conceal_tweak(cx: &mut Block, conceal: &mut [f32; 4]) {
    const MANTISSA_MASK: u32 = 0x807f_ffff;
    const EXPONENT: u32 = 0x4000_0000;

    for (i, c) in conceal.iter_mut().enumerate() {
        let bytes = [cx[4 * i], cx[4 * i + 1], cx[4 * i + 2], cx[4 * i + 3]];
        let lane = i32::from_le_bytes(bytes);
        let r = lane as f32 + *c;
        let r = r * (r * r);
        let r = f32::from_bits((r.to_bits() & MANTISSA_MASK) | EXPONENT);
        let old = f32::from_bits((c.to_bits() & MANTISSA_MASK) | EXPONENT);
        *c += r;
        // `old` is in [2, 4) in magnitude so the product fits an i32
        let noise = (old * 536_870_880.0) as i32;
        cx[4 * i..4 * i + 4].copy_from_slice(&(lane ^ noise).to_le_bytes());
    }
}

fn main_loop(state: &[u8; 200], pad: &mut [Block], p: &Params, input: &[u8], height: u64) {
    let h: [u64; 25] = state_from_bytes(state);
    let mask = p.mask;

    let mut a = [h[0] ^ h[4], h[1] ^ h[5]];
    let mut b0 = block(h[2] ^ h[6], h[3] ^ h[7]);
    let mut b1 = block(h[8] ^ h[10], h[9] ^ h[11]);
    let tweak = match p.base {
        Base::V1 => read_u64_le(input, 35) ^ h[24],
        _ => 0,
    };
    let mut division = h[12];
    let mut sqrt = h[13];
    let mut math = p.random_math.then(|| RandomMath::new(height, &state[96..112]));
    let mut conceal = [0f32; 4];

    let mut address = a[0];
    for _ in 0..p.iterations {
        let j = slot(address, mask);
        let ax = block(a[0], a[1]);
        let mut cx = pad[j];
        if p.conceal {
            conceal_tweak(&mut cx, &mut conceal);
        }
        cx = if p.tube {
            tube_round(&cx, &ax)
        } else {
            aesenc(&cx, &ax)
        };

        pad[j] = match p.base {
            Base::V0 => xor(&b0, &cx),
            Base::V1 => v1_tweak(xor(&b0, &cx)),
            Base::V2 => {
                let siblings = shuffle(pad, j, &ax, &b0, &b1, p.reverse_shuffle);
                if math.is_some() {
                    cx = xor(&cx, &siblings);
                }
                xor(&b0, &cx)
            }
        };

        address = lo(&cx);
        let j = slot(address, mask);
        let mut cl = lo(&pad[j]);
        let ch = hi(&pad[j]);

        if p.base == Base::V2 {
            match math.as_mut() {
                Some(m) => {
                    cl ^= m.mask();
                    let fold = m.run(a, lo(&b0), [lo(&b1), hi(&b1)]);
                    a[0] ^= fold[0];
                    a[1] ^= fold[1];
                }
                None => {
                    cl ^= division ^ (sqrt << 32);
                    let dividend = hi(&cx);
                    let divisor = lo(&cx).wrapping_add(u64::from((sqrt << 1) as u32)) | 0x8000_0001;
                    let divisor = u64::from(divisor as u32);
                    division =
                        u64::from((dividend / divisor) as u32) + ((dividend % divisor) << 32);
                    sqrt = sqrt_fixed(lo(&cx).wrapping_add(division));
                }
            }
        }

        let product = u128::from(address) * u128::from(cl);
        let mut hi_word = (product >> 64) as u64;
        let mut lo_word = product as u64;

        if p.base == Base::V2 {
            if math.is_some() {
                let siblings = shuffle(pad, j, &ax, &b0, &b1, false);
                cx = xor(&cx, &siblings);
            } else {
                pad[j ^ 1] = xor(&pad[j ^ 1], &block(hi_word, lo_word));
                let neighbour = pad[j ^ 2];
                hi_word ^= lo(&neighbour);
                lo_word ^= hi(&neighbour);
                shuffle(pad, j, &ax, &b0, &b1, p.reverse_shuffle);
            }
        }

        a[0] = a[0].wrapping_add(hi_word);
        a[1] = a[1].wrapping_add(lo_word);
        let stored_hi = if p.tube || p.rto {
            a[1] ^ tweak ^ a[0]
        } else {
            a[1] ^ tweak
        };
        pad[j] = block(a[0], stored_hi);

        a[0] ^= cl;
        a[1] ^= ch;
        address = a[0];

        if p.heavy {
            let j = slot(address, mask);
            let n = lo(&pad[j]) as i64;
            let mut d = hi(&pad[j]) as u32 as i32;
            let q = n.wrapping_div(i64::from(d | 5));
            pad[j] = block((n ^ q) as u64, hi(&pad[j]));
            if p.xhv {
                d = !d;
            }
            address = (i64::from(d) ^ q) as u64;
        }

        if p.base == Base::V2 {
            b1 = b0;
        }
        b0 = cx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard 76-byte Monero test blob
    const BLOB: &str = "0305a0dbd6bf05cf16e503f3a66f78007cbf34144332ecbfc22ed95c8700383b309ace1923a0964b00000008ba939a62724c0d7581fce5761e9d8a0e6a1c3f924fdd8493d1115649c05eb601";

    fn hash_hex(input: &[u8], variant: CnVariant, height: u64) -> String {
        hex::encode(cryptonight(input, variant, height).unwrap())
    }

    #[test]
    fn test_cn0_this_is_a_test() {
        assert_eq!(
            hash_hex(b"This is a test", CnVariant::Zero, 0),
            "a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605"
        );
    }

    #[test]
    fn test_cn1_zero_input() {
        assert_eq!(
            hash_hex(&[0u8; 43], CnVariant::One, 0),
            "b5a7f63abb94d07d1a6445c36c07c7e8327fe61b1647e391b4c7edae5de57a3d"
        );
    }

    #[test]
    fn test_cn2_and_cnr() {
        let input = b"This is a test This is a test This is a test";
        assert_eq!(
            hash_hex(input, CnVariant::Two, 0),
            "353fdc068fd47b03c04b9431e005e00b68c2168a3cc7335c8b9b308156591a4f"
        );
        assert_eq!(
            hash_hex(input, CnVariant::R, 1_806_260),
            "f759588ad57e758467295443a9bd71490abff8e9dad1b95b6bf2f5d0d78387bc"
        );
    }

    #[test]
    fn test_variants_on_block_blob() {
        let input = hex::decode(BLOB).unwrap();
        let cases = [
            (CnVariant::Zero, "1a3ffbee909b420d91f7be6e5fb56db71b3110d886011e877ee5786afd080100"),
            (CnVariant::One, "f22d3d6203d2a08b41d9027278d8bcc983acada9b68e52e3c689692a50e921d9"),
            (CnVariant::Two, "97378282cf10e7ad033f7b8074c40e14d06e7f609dddda787680b58c05f43d21"),
            (CnVariant::Fast, "3c7a61084c5eb865b498ab2f5a1ac52c49c177c2d0133442d65ed514335c82c5"),
            (CnVariant::Half, "5d4fbc356097ea6440b0888edeb635ddc84a0e397c868456895c3f29be7312a7"),
            (CnVariant::Xao, "9a29d0c4afdc639b6553b1c83735114c5d77162142975cb850c0a51f6407bd33"),
            (CnVariant::Rto, "82661e1c6e6436668406327a9bb11319a5561615dfec1c9ee3884a6c1ceb76a5"),
            (CnVariant::Rwz, "5f56c6b0996ba23e0bba0729c99074855a10e3087fdbfe947533547376f075b8"),
            (CnVariant::Zls, "516e33c6e446abbccdad18c04cd9a25e64102853b20a42dfdeaa8b599ecf40e2"),
            (CnVariant::Double, "aefbb3f0cc88046d119f6c54b96d90c9e884ea3b5983a60d50a42d7d3ebe4821"),
            (CnVariant::Ccx, "b3a16786d2c985ecadc45f910527c7a196f0e1e97c8709381d7d419335f81672"),
            (CnVariant::Lite0, "3695b4b53bb00358b0ad38dc160feb9e004eece09b83a72ef6ba9864d3510c88"),
            (CnVariant::Lite1, "6d8cdc444e9bbbfd68fc43fcd4855b228c8a1bd91d9d00285bec02b7ca2d6741"),
            (CnVariant::Heavy0, "9983f21bdf2010a8d707bb2f14d78664bbe1187f55014b39e5f3d69328e48fc2"),
            (CnVariant::HeavyXhv, "5ac3f785c490c58550ec95d2726563577e7c1c212d0cde591273201e44fdd5b6"),
            (CnVariant::HeavyTube, "fe53352076eae689fa3b4fda614634cfc312ee0c387df2b8b74da2a159741235"),
            (CnVariant::Pico, "9975f2c1b3b45434a49386213097f31bb4b9a6586a7e81f4429f6d5f65c38d1a"),
        ];

        let mut hasher = CryptoNight::with_capacity(4 * MIB).unwrap();
        for (variant, expected) in cases {
            let got = hex::encode(hasher.hash(&input, variant, 0).unwrap());
            assert_eq!(got, expected, "{variant:?}");
        }
    }

    #[test]
    fn test_v1_rejects_short_input() {
        let err = cryptonight(&[0u8; 42], CnVariant::One, 0).unwrap_err();
        assert_eq!(err, Error::length("cryptonight input", 43, 42));
        assert!(cryptonight(&[0u8; 42], CnVariant::Zero, 0).is_ok());
    }

    #[test]
    fn test_variant_ids() {
        assert_eq!(CnVariant::classic(13).unwrap(), CnVariant::R);
        assert_eq!(CnVariant::heavy(2).unwrap(), CnVariant::HeavyTube);
        assert!(matches!(
            CnVariant::classic(11),
            Err(Error::UnsupportedVariant { id: 11, .. })
        ));
        assert!(CnVariant::classic(18).is_err());
        assert!(CnVariant::light(2).is_err());
        assert!(CnVariant::pico(1).is_err());
        assert!(CnVariant::R.uses_height());
        assert!(!CnVariant::Two.uses_height());
    }

    #[test]
    fn test_height_only_affects_cnr() {
        let input = [7u8; 76];
        let mut hasher = CryptoNight::new(CnVariant::Pico).unwrap();
        assert_eq!(
            hasher.hash(&input, CnVariant::Pico, 1).unwrap(),
            hasher.hash(&input, CnVariant::Pico, 2).unwrap()
        );
    }

    fn isqrt(n: u128) -> u128 {
        let mut x = (n as f64).sqrt() as u128;
        while x * x > n {
            x -= 1;
        }
        while (x + 1) * (x + 1) <= n {
            x += 1;
        }
        x
    }

    #[test]
    fn test_sqrt_fixed_is_exact() {
        let inputs = [0u64, 1, 2, 3, 1 << 32, 0x1234_5678_9abc_def0, u64::MAX - 1, u64::MAX];
        for input in inputs {
            let n = 4 * ((1u128 << 64) + u128::from(input));
            let expected = (isqrt(n) - (1u128 << 33)) as u64;
            assert_eq!(sqrt_fixed(input), expected, "{input:#x}");
        }
    }

    #[test]
    fn test_v1_tweak_table() {
        let mut b = [0u8; 16];
        assert_eq!(v1_tweak(b)[11], 0x10);
        b[11] = 0x30;
        assert_eq!(v1_tweak(b)[11], 0x30 ^ 0x30);
    }

    #[test]
    fn test_tube_round_differs_from_aesenc() {
        let x = [0x5au8; 16];
        let key = [0x33u8; 16];
        assert_ne!(tube_round(&x, &key), aesenc(&x, &key));
        assert_eq!(tube_round(&x, &key), tube_round(&x, &key));
    }
}
