//! JH-256 and JH-512 (42-round final version).

use jh::{Digest, Jh256, Jh512};

pub fn jh256(data: &[u8]) -> [u8; 32] {
    Jh256::digest(data).into()
}

pub fn jh512(data: &[u8]) -> [u8; 64] {
    Jh512::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jh256_vectors() {
        assert_eq!(
            hex::encode(jh256(b"")),
            "46e64619c18bb0a92a5e87185a47eef83ca747b8fcc8e1412921357e326df434"
        );
        assert_eq!(
            hex::encode(jh256(b"abc")),
            "924bc82f24a76d519d4f69493da7fa70dc88bdb6016b6d1cc1dcf7def15e9cdd"
        );
    }

    #[test]
    fn test_jh512_vectors() {
        assert_eq!(
            hex::encode(jh512(b"")),
            "90ecf2f76f9d2c8017d979ad5ab96b87d58fc8fc4b83060f3f900774faa2c8fa\
             be69c5f4ff1ec2b61d6b316941cedee117fb04b1f4c5bc1b919ae841c50eec4f"
        );
        let data: Vec<u8> = (0..64).collect();
        assert_eq!(
            hex::encode(jh512(&data)),
            "483560d10cadec86db6f390f6267e12f99594587d44c202902e8e4bb6c70c6c7\
             fdff6b19965650e15e240bcfcefe4e5051567ef96c758b800efdcaf50a5d5bbd"
        );
    }
}
