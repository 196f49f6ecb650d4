//! Hash primitives shared by the engines.
//!
//! Keccak comes from the `keccak`/`sha3` crates, KangarooTwelve from `k12`
//! and the AES round from `aes::hazmat` (or intrinsics). BLAKE, Grøstl, JH,
//! Skein, BMW, Shabal and Whirlpool wrap their RustCrypto-style crates.
//! CubeHash, Luffa, SHAvite-3, SIMD and ECHO are implemented here.

pub mod aes;
pub mod blake;
pub mod bmw;
pub mod cubehash;
pub mod echo;
pub mod groestl;
pub mod jh;
pub mod kangaroo;
pub mod keccak;
pub mod luffa;
pub mod shabal;
pub mod shavite;
pub mod simd;
pub mod skein;
pub mod whirlpool;

pub use self::blake::{blake256, blake512};
pub use self::bmw::bmw512;
pub use self::cubehash::cubehash512;
pub use self::echo::echo512;
pub use self::groestl::{groestl256, groestl512};
pub use self::jh::{jh256, jh512};
pub use self::kangaroo::k12;
pub use self::keccak::{keccak256, keccak512, sha3_256};
pub use self::luffa::luffa512;
pub use self::shabal::shabal512;
pub use self::shavite::shavite512;
pub use self::simd::simd512;
pub use self::skein::{skein512_256, skein512_512};
pub use self::whirlpool::whirlpool512;
