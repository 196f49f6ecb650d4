//! Whirlpool (ISO/IEC 10118-3, final version).

use whirlpool::{Digest, Whirlpool};

pub fn whirlpool512(data: &[u8]) -> [u8; 64] {
    Whirlpool::digest(data).into()
}
