//! multipow
//!
//! Multi-algorithm proof-of-work hashing for mining and validation clients.
//! The algorithms live in [`multipow_core`]; this crate adds configuration,
//! logging setup and the `multipow` command-line tool.
//!
//! # Example
//!
//! ```rust
//! use multipow::{Algorithm, Engine};
//!
//! let engine = Engine::new();
//! let digest = engine
//!     .hash(&Algorithm::AstroBwt { input: b"block header bytes", mode: 1 })
//!     .unwrap();
//! assert_eq!(digest.len(), 32);
//! ```

// Re-export the core algorithms
pub use multipow_core as algorithm;

pub mod config;
pub mod logging;

// Convenience re-exports
pub use algorithm::{Algorithm, CryptoNightFamily, Engine, EngineConfig, Error, EthashEpoch};
pub use config::{Config, DatasetMode, LogFormat};
