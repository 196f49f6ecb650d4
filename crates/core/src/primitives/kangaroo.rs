//! KangarooTwelve with an empty customization string.

use k12::KangarooTwelve;
use k12::digest::{ExtendableOutput, Update};

pub fn k12(data: &[u8]) -> [u8; 32] {
    let mut hasher = KangarooTwelve::default();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize_xof_into(&mut out);
    out
}
