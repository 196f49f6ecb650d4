//! Blue Midnight Wish 512.

use bmw_hash::{Bmw512, Digest};

pub fn bmw512(data: &[u8]) -> [u8; 64] {
    Bmw512::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmw512_vectors() {
        assert_eq!(
            hex::encode(bmw512(b"")),
            "6a725655c42bc8a2a20549dd5a233a6a2beb01616975851fd122504e604b46af\
             7d96697d0b6333db1d1709d6df328d2a6c786551b0cce2255e8c7332b4819c0e"
        );
        assert_eq!(
            hex::encode(bmw512(b"abc")),
            "8f37bef264289f61f3d713944d394a7ac1dd95d3fe5787b5d325a310bc9cd187\
             83852bfee12fbdeaab3ad9a67f2b654e348714aed3acf7d7548e95591af68046"
        );
    }

    #[test]
    fn test_bmw512_chain_input() {
        let data: Vec<u8> = (0..64).collect();
        assert_eq!(
            hex::encode(bmw512(&data)),
            "824168671c2e3f35ebba82b63b9e6c42b8411cdcda1041264bb5f50abd507d18\
             27edcfff050f6c8675cb8ccba8699c843dcf5fb81ccadab1deef0d9cf4770257"
        );
    }
}
