//! Grøstl-256 and Grøstl-512 (final-round tweak).

use groestl::{Digest, Groestl256, Groestl512};

pub fn groestl256(data: &[u8]) -> [u8; 32] {
    Groestl256::digest(data).into()
}

pub fn groestl512(data: &[u8]) -> [u8; 64] {
    Groestl512::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groestl256_vectors() {
        assert_eq!(
            hex::encode(groestl256(b"")),
            "1a52d11d550039be16107f9c58db9ebcc417f16f736adb2502567119f0083467"
        );
        assert_eq!(
            hex::encode(groestl256(b"The quick brown fox jumps over the lazy dog")),
            "8c7ad62eb26a21297bc39c2d7293b4bd4d3399fa8afab29e970471739e28b301"
        );
    }

    #[test]
    fn test_groestl512_vectors() {
        assert_eq!(
            hex::encode(groestl512(b"")),
            "6d3ad29d279110eef3adbd66de2a0345a77baede1557f5d099fce0c03d6dc2ba\
             8e6d4a6633dfbd66053c20faa87d1a11f39a7fbe4a6c2f009801370308fc4ad8"
        );
        let data: Vec<u8> = (0..64).collect();
        assert_eq!(
            hex::encode(groestl512(&data)),
            "6e8c9b90e36cea68c029a7d8b95b718c84205d81be227ba61510f567d46b83ed\
             d11f301bf1e7041be991b22fdbee82dbdce7ab0e0ee42a795ca965a439532a39"
        );
    }
}
