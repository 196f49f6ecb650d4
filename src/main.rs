//! multipow CLI
//!
//! Compute and benchmark proof-of-work digests from the command line.
//!
//! # Commands
//!
//! - `hash` - Hash one input with any supported algorithm
//! - `seed-hash` - Print the Ethash seed hash and sizes of an epoch
//! - `benchmark` - Measure hashrate, after building any epoch state

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use multipow::algorithm::{CycleVariant, cache_size, dataset_size, seed_hash};
use multipow::logging::init_logging;
use multipow::{Algorithm, Config, CryptoNightFamily, DatasetMode, Engine, EthashEpoch, LogFormat};

#[derive(Parser)]
#[command(name = "multipow")]
#[command(version)]
#[command(about = "Multi-algorithm proof-of-work hashing engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `debug,multipow_core=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// pretty, compact or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Worker threads (default: number of CPU cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// light or full Ethash/Etchash/KawPow dataset
    #[arg(long, global = true)]
    ethash_mode: Option<DatasetMode>,

    /// light or full RandomX dataset
    #[arg(long, global = true)]
    randomx_mode: Option<DatasetMode>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash one input
    Hash(HashArgs),

    /// Print the Ethash seed hash for an epoch
    SeedHash {
        #[arg(long)]
        epoch: u64,
    },

    /// Run performance benchmark
    Benchmark {
        #[command(flatten)]
        args: HashArgs,

        /// Number of hashes to compute
        #[arg(short, long, default_value = "100")]
        count: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgoName {
    Keccak256,
    Sha3_256,
    K12,
    Cryptonight,
    CryptonightLight,
    CryptonightHeavy,
    CryptonightPico,
    Ghostrider,
    Randomx,
    Ethash,
    Etchash,
    Kawpow,
    Astrobwt,
    Argon2,
    C29,
    C29b,
    C29i,
}

impl AlgoName {
    fn cycle_variant(self) -> Option<CycleVariant> {
        match self {
            Self::C29 => Some(CycleVariant::C29),
            Self::C29b => Some(CycleVariant::C29b),
            Self::C29i => Some(CycleVariant::C29i),
            _ => None,
        }
    }
}

#[derive(Args)]
struct HashArgs {
    algo: AlgoName,

    /// Input hex (header hash for ethash, etchash and kawpow)
    #[arg(long)]
    input: Option<String>,

    /// Variant id within the algorithm family (astrobwt mode)
    #[arg(long, visible_alias = "mode", default_value_t = 0)]
    variant: u64,

    /// Block height (cn/r, ethash, etchash, kawpow)
    #[arg(long, default_value_t = 0)]
    height: u64,

    /// RandomX key, or Ethash seed hash in place of --height (hex)
    #[arg(long)]
    seed: Option<String>,

    /// 8-byte big-endian nonce (hex)
    #[arg(long)]
    nonce: Option<String>,

    /// KawPow share target; accepted, not checked
    #[arg(long, value_parser = parse_u32, default_value = "0")]
    target: u32,

    /// Comma-separated edge indices of a c29, c29b or c29i ring
    #[arg(long, value_delimiter = ',', value_parser = parse_u32)]
    ring: Vec<u32>,
}

/// Hex-decoded request buffers the borrowed `Algorithm` points into.
struct Request {
    input: Vec<u8>,
    seed: Option<Vec<u8>>,
    nonce: Vec<u8>,
    ring: Vec<u32>,
}

impl Request {
    fn decode(args: &HashArgs, default_input: Option<Vec<u8>>) -> anyhow::Result<Self> {
        let input = match (&args.input, default_input) {
            (Some(hex_input), _) => decode_hex("--input", hex_input)?,
            (None, Some(input)) => input,
            // Cycle hashes read only the ring.
            (None, None) if args.algo.cycle_variant().is_some() => Vec::new(),
            (None, None) => bail!("--input is required"),
        };
        let seed = args
            .seed
            .as_deref()
            .map(|s| decode_hex("--seed", s))
            .transpose()?;
        let nonce = match &args.nonce {
            Some(n) => decode_hex("--nonce", n)?,
            None => vec![0u8; 8],
        };
        Ok(Self {
            input,
            seed,
            nonce,
            ring: args.ring.clone(),
        })
    }

    fn algorithm<'a>(&'a self, args: &HashArgs) -> anyhow::Result<Algorithm<'a>> {
        let cn = move |family: CryptoNightFamily| -> anyhow::Result<Algorithm<'a>> {
            Ok(Algorithm::CryptoNight {
                family,
                input: &self.input,
                variant: u32::try_from(args.variant).context("cryptonight variant out of range")?,
                height: args.height,
            })
        };
        Ok(match args.algo {
            AlgoName::Keccak256 => Algorithm::Keccak256 { input: &self.input },
            AlgoName::Sha3_256 => Algorithm::Sha3_256 { input: &self.input },
            AlgoName::K12 => Algorithm::K12 { input: &self.input },
            AlgoName::Cryptonight => cn(CryptoNightFamily::Classic)?,
            AlgoName::CryptonightLight => cn(CryptoNightFamily::Light)?,
            AlgoName::CryptonightHeavy => cn(CryptoNightFamily::Heavy)?,
            AlgoName::CryptonightPico => cn(CryptoNightFamily::Pico)?,
            AlgoName::Ghostrider => Algorithm::CryptoNight {
                family: CryptoNightFamily::Classic,
                input: &self.input,
                variant: 18,
                height: args.height,
            },
            AlgoName::Randomx => Algorithm::RandomX {
                input: &self.input,
                seed: self.seed.as_deref().context("randomx needs --seed")?,
                variant: args.variant,
            },
            AlgoName::Ethash => Algorithm::Ethash {
                header: &self.input,
                nonce: &self.nonce,
                epoch: match &self.seed {
                    Some(seed) => EthashEpoch::SeedHash(seed),
                    None => EthashEpoch::Height(args.height),
                },
            },
            AlgoName::Etchash => Algorithm::Etchash {
                header: &self.input,
                nonce: &self.nonce,
                height: args.height,
            },
            AlgoName::Kawpow => Algorithm::KawPow {
                height: args.height,
                header: &self.input,
                nonce: u64::from_be_bytes(
                    self.nonce
                        .as_slice()
                        .try_into()
                        .context("--nonce must be 8 bytes")?,
                ),
                target: args.target,
            },
            AlgoName::Astrobwt => Algorithm::AstroBwt {
                input: &self.input,
                mode: args.variant,
            },
            AlgoName::Argon2 => Algorithm::Argon2 {
                input: &self.input,
                variant: args.variant,
            },
            AlgoName::C29 | AlgoName::C29b | AlgoName::C29i => {
                let variant = args.algo.cycle_variant().context("not a cycle hash")?;
                if self.ring.is_empty() {
                    bail!("{} needs --ring", variant.name());
                }
                Algorithm::CycleHash {
                    ring: &self.ring,
                    variant,
                }
            }
        })
    }
}

#[derive(Serialize)]
struct HashReport {
    algorithm: &'static str,
    digest: String,
    elapsed_ms: f64,
}

#[derive(Serialize)]
struct SeedReport {
    epoch: u64,
    seed_hash: String,
    cache_size: u64,
    dataset_size: u64,
}

#[derive(Serialize)]
struct BenchReport {
    algorithm: &'static str,
    count: u32,
    threads: usize,
    warmup_ms: f64,
    elapsed_s: f64,
    hashrate: f64,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    let threads = config.threads.unwrap_or_else(num_cpus::get);
    #[cfg(feature = "parallel")]
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    tracing::debug!(?config, threads, "configured");

    let engine = Engine::with_config(config.engine_config());
    match cli.command {
        Commands::Hash(args) => cmd_hash(&engine, &args, cli.json),
        Commands::SeedHash { epoch } => cmd_seed_hash(epoch, cli.json),
        Commands::Benchmark { args, count } => cmd_benchmark(&engine, &args, count, threads, cli.json),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    if let Some(mode) = cli.ethash_mode {
        config.ethash_mode = mode;
    }
    if let Some(mode) = cli.randomx_mode {
        config.randomx_mode = mode;
    }
    Ok(config)
}

fn cmd_hash(engine: &Engine, args: &HashArgs, json: bool) -> anyhow::Result<()> {
    let request = Request::decode(args, None)?;
    let algorithm = request.algorithm(args)?;

    let start = Instant::now();
    let digest = engine.hash(&algorithm)?;
    let report = HashReport {
        algorithm: algorithm.name(),
        digest: hex::encode(digest),
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", report.digest);
    }
    Ok(())
}

fn cmd_seed_hash(epoch: u64, json: bool) -> anyhow::Result<()> {
    let report = SeedReport {
        epoch,
        seed_hash: hex::encode(seed_hash(epoch)),
        cache_size: cache_size(epoch),
        dataset_size: dataset_size(epoch),
    };
    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", report.seed_hash);
    }
    Ok(())
}

fn cmd_benchmark(
    engine: &Engine,
    args: &HashArgs,
    count: u32,
    threads: usize,
    json: bool,
) -> anyhow::Result<()> {
    let default_input = match args.algo {
        AlgoName::Ethash | AlgoName::Etchash | AlgoName::Kawpow => vec![0x5a; 32],
        _ => b"benchmark input data for multipow, seventy-six bytes of block header........".to_vec(),
    };
    let request = Request::decode(args, Some(default_input))?;
    let algorithm = request.algorithm(args)?;
    let name = algorithm.name();

    if !json {
        println!("Running {} benchmark with {} hashes on {} threads...", name, count, threads);
    }

    // First hash pays for any epoch cache or dataset build.
    let warmup = Instant::now();
    engine.hash(&algorithm)?;
    let warmup_ms = warmup.elapsed().as_secs_f64() * 1e3;

    let hash_one = |i: u32| -> anyhow::Result<()> {
        let mut input = request.input.clone();
        let tail = input.len().saturating_sub(4);
        for (b, n) in input[tail..].iter_mut().zip(i.to_le_bytes()) {
            *b ^= n;
        }
        let varied = Request {
            input,
            seed: request.seed.clone(),
            nonce: request.nonce.clone(),
            ring: request.ring.clone(),
        };
        engine.hash(&varied.algorithm(args)?)?;
        Ok(())
    };

    let start = Instant::now();
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..count).into_par_iter().try_for_each(hash_one)?;
    }
    #[cfg(not(feature = "parallel"))]
    (0..count).try_for_each(hash_one)?;
    let elapsed = start.elapsed().as_secs_f64();

    let report = BenchReport {
        algorithm: name,
        count,
        threads,
        warmup_ms,
        elapsed_s: elapsed,
        hashrate: f64::from(count) / elapsed,
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("\nResults:");
        println!("  Warmup (epoch build + 1 hash): {:.2} ms", report.warmup_ms);
        println!("  Total hashes: {}", report.count);
        println!("  Time elapsed: {:.2}s", report.elapsed_s);
        println!("  Hashrate: {:.2} H/s", report.hashrate);
    }
    Ok(())
}

fn decode_hex(flag: &str, value: &str) -> anyhow::Result<Vec<u8>> {
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).with_context(|| format!("{flag} is not valid hex"))
}

fn parse_u32(value: &str) -> Result<u32, String> {
    match value.strip_prefix("0x") {
        Some(hex_value) => u32::from_str_radix(hex_value, 16),
        None => value.parse(),
    }
    .map_err(|e| e.to_string())
}
