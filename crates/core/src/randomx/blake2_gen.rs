//! Byte stream feeding the SuperscalarHash program generator.

use blake2::{Blake2b512, Digest};

pub(crate) struct Blake2Generator {
    data: [u8; 64],
    index: usize,
}

impl Blake2Generator {
    /// Up to 60 seed bytes followed by a little-endian nonce.
    pub(crate) fn new(seed: &[u8], nonce: u32) -> Self {
        let mut data = [0u8; 64];
        let n = seed.len().min(60);
        data[..n].copy_from_slice(&seed[..n]);
        data[60..].copy_from_slice(&nonce.to_le_bytes());
        Self { data, index: 64 }
    }

    fn reserve(&mut self, bytes: usize) {
        if self.index + bytes > self.data.len() {
            let digest = Blake2b512::digest(self.data);
            self.data.copy_from_slice(&digest);
            self.index = 0;
        }
    }

    pub(crate) fn byte(&mut self) -> u8 {
        self.reserve(1);
        let b = self.data[self.index];
        self.index += 1;
        b
    }

    pub(crate) fn word(&mut self) -> u32 {
        self.reserve(4);
        let i = self.index;
        self.index += 4;
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_bytes_come_from_rehashed_seed() {
        let mut rng = Blake2Generator::new(b"seed", 0);
        let mut block = [0u8; 64];
        block[..4].copy_from_slice(b"seed");
        let expected = Blake2b512::digest(block);
        assert_eq!(rng.byte(), expected[0]);
        assert_eq!(rng.word(), u32::from_le_bytes([expected[1], expected[2], expected[3], expected[4]]));
    }

    #[test]
    fn test_word_never_straddles_refill() {
        let mut rng = Blake2Generator::new(&[1u8; 80], 3);
        for _ in 0..61 {
            rng.byte();
        }
        let before = rng.data;
        rng.word();
        assert_ne!(before, rng.data);
        assert_eq!(rng.index, 4);
    }
}
