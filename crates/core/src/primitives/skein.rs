//! Skein-512 (v1.3) at 256- and 512-bit output.

use skein::consts::{U32, U64};
use skein::{Digest, Skein512};

pub fn skein512_256(data: &[u8]) -> [u8; 32] {
    Skein512::<U32>::digest(data).into()
}

pub fn skein512_512(data: &[u8]) -> [u8; 64] {
    Skein512::<U64>::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skein512_256_empty() {
        assert_eq!(
            hex::encode(skein512_256(b"")),
            "39ccc4554a8b31853b9de7a1fe638a24cce6b35a55f2431009e18780335d2621"
        );
    }

    #[test]
    fn test_skein512_512_vectors() {
        assert_eq!(
            hex::encode(skein512_512(b"")),
            "bc5b4c50925519c290cc634277ae3d6257212395cba733bbad37a4af0fa06af4\
             1fca7903d06564fea7a2d3730dbdb80c1f85562dfcc070334ea4d1d9e72cba7a"
        );
        assert_eq!(
            hex::encode(skein512_512(&[0xff])),
            "71b7bce6fe6452227b9ced6014249e5bf9a9754c3ad618ccc4e0aae16b316cc8\
             ca698d864307ed3e80b6ef1570812ac5272dc409b5a012df2a579102f340617a"
        );
        let data: Vec<u8> = (0..64).collect();
        assert_eq!(
            hex::encode(skein512_512(&data)),
            "78cfdbdb2bd125f49d26146e208ebc7ceae57619bd68a2e4e9cdb1db198c995e\
             3795fadbccaabb000463525eee2e1e7f6e8309c765a61e19fccdb18f5284c070"
        );
    }
}
