//! BLAKE-256 and BLAKE-512 (the SHA-3 finalist, 14 and 16 rounds).

use blake_hash::{Blake256, Blake512, Digest};

pub fn blake256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake256::digest(data));
    out
}

pub fn blake512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Blake512::digest(data));
    out
}
