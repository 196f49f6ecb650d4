//! Single AES rounds and the AES-256 key schedule.
//!
//! CryptoNight and RandomX both use bare AESENC/AESDEC rounds rather than the
//! full cipher. Hardware intrinsics are used when the target enables them;
//! otherwise the round functions from `aes::hazmat` provide the same result.

/// One AESENC round: ShiftRows, SubBytes, MixColumns, then XOR `key`.
#[inline(always)]
pub fn aesenc(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    #[cfg(all(target_arch = "x86_64", target_feature = "aes"))]
    {
        aesenc_x86(state, key)
    }

    #[cfg(all(target_arch = "aarch64", target_feature = "aes"))]
    {
        aesenc_arm(state, key)
    }

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "aes"),
        all(target_arch = "aarch64", target_feature = "aes")
    )))]
    {
        aesenc_soft(state, key)
    }
}

/// One AESDEC round: inverse ShiftRows, inverse SubBytes, inverse
/// MixColumns, then XOR `key`.
#[inline(always)]
pub fn aesdec(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    #[cfg(all(target_arch = "x86_64", target_feature = "aes"))]
    {
        aesdec_x86(state, key)
    }

    #[cfg(all(target_arch = "aarch64", target_feature = "aes"))]
    {
        aesdec_arm(state, key)
    }

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "aes"),
        all(target_arch = "aarch64", target_feature = "aes")
    )))]
    {
        aesdec_soft(state, key)
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "aes"))]
#[inline(always)]
fn aesenc_x86(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    use core::arch::x86_64::{__m128i, _mm_aesenc_si128, _mm_loadu_si128, _mm_storeu_si128};

    unsafe {
        let s = _mm_loadu_si128(state.as_ptr() as *const __m128i);
        let k = _mm_loadu_si128(key.as_ptr() as *const __m128i);
        let mut result = [0u8; 16];
        _mm_storeu_si128(result.as_mut_ptr() as *mut __m128i, _mm_aesenc_si128(s, k));
        result
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "aes"))]
#[inline(always)]
fn aesdec_x86(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    use core::arch::x86_64::{__m128i, _mm_aesdec_si128, _mm_loadu_si128, _mm_storeu_si128};

    unsafe {
        let s = _mm_loadu_si128(state.as_ptr() as *const __m128i);
        let k = _mm_loadu_si128(key.as_ptr() as *const __m128i);
        let mut result = [0u8; 16];
        _mm_storeu_si128(result.as_mut_ptr() as *mut __m128i, _mm_aesdec_si128(s, k));
        result
    }
}

// ARM AESE/AESD XOR the key before the byte substitution, while AESENC and
// AESDEC XOR it after the column mix. Run them with a zero key and XOR the
// real key last.
#[cfg(all(target_arch = "aarch64", target_feature = "aes"))]
#[inline(always)]
fn aesenc_arm(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    use core::arch::aarch64::{vaeseq_u8, vaesmcq_u8, vdupq_n_u8, veorq_u8, vld1q_u8, vst1q_u8};

    unsafe {
        let s = vld1q_u8(state.as_ptr());
        let k = vld1q_u8(key.as_ptr());
        let s = veorq_u8(vaesmcq_u8(vaeseq_u8(s, vdupq_n_u8(0))), k);
        let mut result = [0u8; 16];
        vst1q_u8(result.as_mut_ptr(), s);
        result
    }
}

#[cfg(all(target_arch = "aarch64", target_feature = "aes"))]
#[inline(always)]
fn aesdec_arm(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    use core::arch::aarch64::{vaesdq_u8, vaesimcq_u8, vdupq_n_u8, veorq_u8, vld1q_u8, vst1q_u8};

    unsafe {
        let s = vld1q_u8(state.as_ptr());
        let k = vld1q_u8(key.as_ptr());
        let s = veorq_u8(vaesimcq_u8(vaesdq_u8(s, vdupq_n_u8(0))), k);
        let mut result = [0u8; 16];
        vst1q_u8(result.as_mut_ptr(), s);
        result
    }
}

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "aes"),
    all(target_arch = "aarch64", target_feature = "aes")
)))]
#[inline(always)]
fn aesenc_soft(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    let mut block = aes::Block::clone_from_slice(state);
    aes::hazmat::cipher_round(&mut block, &aes::Block::clone_from_slice(key));
    let mut result = [0u8; 16];
    result.copy_from_slice(&block);
    result
}

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "aes"),
    all(target_arch = "aarch64", target_feature = "aes")
)))]
#[inline(always)]
fn aesdec_soft(state: &[u8; 16], key: &[u8; 16]) -> [u8; 16] {
    let mut block = aes::Block::clone_from_slice(state);
    aes::hazmat::equiv_inv_cipher_round(&mut block, &aes::Block::clone_from_slice(key));
    let mut result = [0u8; 16];
    result.copy_from_slice(&block);
    result
}

/// First ten round keys of the AES-256 schedule for a 32-byte key.
///
/// CryptoNight only ever runs ten AESENC rounds, so the remaining
/// keys of the full schedule are never derived.
pub fn expand_key_256(key: &[u8; 32]) -> [[u8; 16]; 10] {
    const RCON: [u8; 5] = [0x01, 0x02, 0x04, 0x08, 0x10];

    let mut words = [[0u8; 4]; 40];
    for (i, w) in words.iter_mut().take(8).enumerate() {
        w.copy_from_slice(&key[i * 4..i * 4 + 4]);
    }
    for i in 8..40 {
        let mut temp = words[i - 1];
        if i % 8 == 0 {
            temp.rotate_left(1);
            temp = temp.map(|b| SBOX[b as usize]);
            temp[0] ^= RCON[i / 8 - 1];
        } else if i % 8 == 4 {
            temp = temp.map(|b| SBOX[b as usize]);
        }
        for b in 0..4 {
            words[i][b] = words[i - 8][b] ^ temp[b];
        }
    }

    let mut keys = [[0u8; 16]; 10];
    for (k, key) in keys.iter_mut().enumerate() {
        for w in 0..4 {
            key[w * 4..w * 4 + 4].copy_from_slice(&words[k * 4 + w]);
        }
    }
    keys
}

/// AES S-box (key schedule and Grøstl)
pub(crate) const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];
