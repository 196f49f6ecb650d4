//! Cross-engine tests through the dispatcher.

use crate::{Algorithm, CryptoNightFamily, Engine, EngineConfig, Error, EthashEpoch};

fn bit_distance(a: &[u8; 32], b: &[u8; 32]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).unwrap();
    buf
}

fn cheap_algorithms(input: &[u8]) -> Vec<Algorithm<'_>> {
    vec![
        Algorithm::Keccak256 { input },
        Algorithm::Sha3_256 { input },
        Algorithm::CryptoNight {
            family: CryptoNightFamily::Pico,
            input,
            variant: 0,
            height: 0,
        },
        Algorithm::CryptoNight {
            family: CryptoNightFamily::Light,
            input,
            variant: 1,
            height: 0,
        },
        Algorithm::AstroBwt { input, mode: 1 },
        Algorithm::Argon2 { input, variant: 1 },
    ]
}

#[test]
fn test_repeated_calls_are_deterministic() {
    let engine = Engine::new();
    let input = random_bytes::<76>();
    for algorithm in cheap_algorithms(&input) {
        let first = engine.hash(&algorithm).unwrap();
        let second = engine.hash(&algorithm).unwrap();
        assert_eq!(first, second, "{}", algorithm.name());
    }
}

#[test]
fn test_single_bit_flip_avalanches() {
    let engine = Engine::new();
    let input = random_bytes::<76>();
    let mut flipped = input;
    let bit = usize::from(random_bytes::<1>()[0]) % (flipped.len() * 8);
    flipped[bit / 8] ^= 1 << (bit % 8);

    for (a, b) in cheap_algorithms(&input)
        .into_iter()
        .zip(cheap_algorithms(&flipped))
    {
        let ha = engine.hash(&a).unwrap();
        let hb = engine.hash(&b).unwrap();
        assert_ne!(ha, hb, "{}", a.name());
        // 256 differing bits is as unlikely as 0; allow a wide band.
        let d = bit_distance(&ha, &hb);
        assert!((64..=192).contains(&d), "{}: {d} bits differ", a.name());
    }
}

#[test]
fn test_engines_can_be_shared_across_threads() {
    let engine = std::sync::Arc::new(Engine::new());
    let input = random_bytes::<76>();
    let expected = engine
        .hash(&Algorithm::CryptoNight {
            family: CryptoNightFamily::Pico,
            input: &input,
            variant: 0,
            height: 0,
        })
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || {
                engine
                    .hash(&Algorithm::CryptoNight {
                        family: CryptoNightFamily::Pico,
                        input: &input,
                        variant: 0,
                        height: 0,
                    })
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_malformed_inputs_never_produce_a_digest() {
    let engine = Engine::new();
    let cases = [
        Algorithm::Etchash {
            header: &[0u8; 20],
            nonce: &[0u8; 8],
            height: 0,
        },
        Algorithm::Ethash {
            header: &[0u8; 32],
            nonce: &[0u8; 8],
            epoch: EthashEpoch::SeedHash(&[0u8; 16]),
        },
        Algorithm::RandomX {
            input: b"x",
            seed: b"too short",
            variant: 0,
        },
        Algorithm::Argon2 {
            input: b"short",
            variant: 0,
        },
        Algorithm::CryptoNight {
            family: CryptoNightFamily::Classic,
            input: b"under forty-three bytes",
            variant: 1,
            height: 0,
        },
    ];
    for algorithm in cases {
        let err = engine.hash(&algorithm).unwrap_err();
        assert!(
            matches!(err, Error::InvalidInputLength { .. }),
            "{}: {err}",
            algorithm.name()
        );
    }
}

#[test]
fn test_unknown_seed_hash_is_an_epoch_error() {
    let engine = Engine::new();
    let err = engine
        .hash(&Algorithm::Ethash {
            header: &[0u8; 32],
            nonce: &[0u8; 8],
            epoch: EthashEpoch::SeedHash(&[0xab; 32]),
        })
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedEpoch { .. }), "{err}");
}

#[test]
#[ignore = "builds the epoch 41 ethash cache"]
fn test_ethash_height_vector() {
    let header = hex::decode("f5afa3074287b2b33e975468ae613e023e478112530bc19d4187693c13943445").unwrap();
    let nonce = hex::decode("ff4136b6b6a244ec").unwrap();
    let digest = Engine::new()
        .hash(&Algorithm::Ethash {
            header: &header,
            nonce: &nonce,
            epoch: EthashEpoch::Height(1_257_006),
        })
        .unwrap();
    assert_eq!(
        hex::encode(crate::reversed(digest)),
        "0000000000095d18875acd4a2c2a5ff476c9acf283b4975d7af8d6c33d119c74"
    );
}

// Agrees with a separate C implementation of Ethash using the ECIP-1099 epoch
// rule, which reproduces the epoch 41 mainnet vector above.
#[test]
fn test_etchash_after_epoch_doubling() {
    let engine = Engine::new();
    let header: [u8; 32] =
        hex::decode("f5afa3074287b2b33e975468ae613e023e478112530bc19d4187693c13943445")
            .unwrap()
            .try_into()
            .unwrap();
    let nonce = hex::decode("ff4136b6b6a244ec").unwrap();
    let out = engine
        .etchash(11_700_000, &header, u64::from_be_bytes(nonce.clone().try_into().unwrap()))
        .unwrap();
    assert_eq!(
        hex::encode(out.result),
        "579689a797304e7eef398e861906d3939afca186e853c7fe3804efca72142ed2"
    );
    assert_eq!(
        hex::encode(out.mix_hash),
        "0c16f71ab3ffc9e6098abd68a3ee089ab973974c9985ac9b5b706718bbca5dac"
    );

    let digest = engine
        .hash(&Algorithm::Etchash {
            header: &header,
            nonce: &nonce,
            height: 11_700_000,
        })
        .unwrap();
    assert_eq!(crate::reversed(digest), out.result);
}

#[test]
#[ignore = "materializes the 1 GiB epoch 0 ethash dataset"]
fn test_ethash_full_dataset_matches_light() {
    let light = Engine::new();
    let full = Engine::with_config(EngineConfig {
        ethash_full_dataset: true,
        ..EngineConfig::default()
    });
    let header = [0x11u8; 32];
    for nonce in [0u64, 1, 0xdead_beef_0000_0001] {
        assert_eq!(
            light.ethash_by_height(0, &header, nonce).unwrap(),
            full.ethash_by_height(0, &header, nonce).unwrap()
        );
    }
}

#[test]
#[ignore = "materializes the 1 GiB dataset for block 30000"]
fn test_kawpow_full_dataset_matches_light() {
    let light = Engine::new();
    let full = Engine::with_config(EngineConfig {
        ethash_full_dataset: true,
        ..EngineConfig::default()
    });
    let header = [0x5au8; 32];
    for nonce in [0u64, 0x1234_5678_9abc_def0] {
        assert_eq!(
            light.kawpow(30_000, &header, nonce).unwrap(),
            full.kawpow(30_000, &header, nonce).unwrap()
        );
    }
}

#[test]
#[ignore = "materializes the 2 GiB RandomX dataset"]
fn test_randomx_full_dataset_matches_light() {
    let light = Engine::new();
    let full = Engine::with_config(EngineConfig {
        randomx_full_dataset: true,
        ..EngineConfig::default()
    });
    let seed = [7u8; 32];
    for input in [&b"This is a test"[..], &[0u8; 76][..]] {
        let algorithm = Algorithm::RandomX {
            input,
            seed: &seed,
            variant: 0,
        };
        assert_eq!(light.hash(&algorithm).unwrap(), full.hash(&algorithm).unwrap());
    }
}

#[test]
fn test_kawpow_through_engine_matches_verify() {
    let engine = Engine::new();
    let header = [0x5au8; 32];
    let out = engine.kawpow(30_000, &header, 0x1234_5678_9abc_def0).unwrap();
    let verified = engine
        .kawpow_verify(30_000, &header, 0x1234_5678_9abc_def0, &out.mix_hash)
        .unwrap();
    assert_eq!(verified, Some(out.final_hash));
    assert_eq!(
        crate::kawpow_final(&header, 0x1234_5678_9abc_def0, &out.mix_hash),
        out.final_hash
    );
    let mut wrong = out.mix_hash;
    wrong[0] ^= 1;
    assert_eq!(
        engine
            .kawpow_verify(30_000, &header, 0x1234_5678_9abc_def0, &wrong)
            .unwrap(),
        None
    );
}

#[test]
#[ignore = "builds a 256 MiB RandomX cache"]
fn test_randomx_cache_reuse_is_idempotent() {
    let engine = Engine::new();
    let seed = [7u8; 32];
    let algorithm = Algorithm::RandomX {
        input: b"This is a test",
        seed: &seed,
        variant: 0,
    };
    let first = engine.hash(&algorithm).unwrap();
    engine.invalidate_all();
    assert_eq!(engine.hash(&algorithm).unwrap(), first);
}

// Parameters mirror xmrig's RandomX_KevaConfig ("RandomKV\x01" salt, 128 KiB L2, 1 MiB L3).
#[test]
#[ignore = "vector taken from a pool harness that never asserted it; the Keva parameters are unconfirmed"]
fn test_randomx_keva_vector() {
    let seed = hex::decode("000000000000000100000000000000000000000f000000042000000000000000").unwrap();
    let digest = Engine::new()
        .hash(&Algorithm::RandomX {
            input: b"This is a test",
            seed: &seed,
            variant: 19,
        })
        .unwrap();
    assert_eq!(
        hex::encode(digest),
        "832ad20813a767b05e160b9db4d6f0c262b45845ae5b24dc9d0ee2ea1ddd0b69"
    );
}

#[test]
#[ignore = "self-referential vector from a pool harness that never asserted it"]
fn test_ethash_seed_hash_vector() {
    let header = hex::decode("dc0818cf78f21a8e70579cb46a43643f78291264dda342ae31049421c82d21ae").unwrap();
    let nonce = hex::decode("689056015818adbe").unwrap();
    let seed = hex::decode("4fffe9ae21f1c9e15207b1f472d5bbdd68c9595d461666602f2be20daf5e7843").unwrap();
    let digest = Engine::new()
        .hash(&Algorithm::Ethash {
            header: &header,
            nonce: &nonce,
            epoch: EthashEpoch::SeedHash(&seed),
        })
        .unwrap();
    assert_eq!(crate::reversed(digest).as_slice(), header.as_slice());
}
