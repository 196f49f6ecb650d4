//! Shabal-512.

use shabal::{Digest, Shabal512};

pub fn shabal512(data: &[u8]) -> [u8; 64] {
    Shabal512::digest(data).into()
}
