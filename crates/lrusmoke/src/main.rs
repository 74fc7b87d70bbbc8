//! lrusmoke - manual smoke test for lrucache

use anyhow::{ensure, Result};
use clap::Parser;
use lrucache::LruCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache capacity for the random workload (number of items)
    #[arg(short, long, default_value_t = 2)]
    capacity: usize,

    /// Random operations to run after the scripted scenario
    #[arg(short = 'n', long, default_value_t = 0)]
    ops: usize,

    /// Size of the key space for random operations
    #[arg(short, long, default_value_t = 16)]
    keys: u64,

    /// Seed for the random workload
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    // Initialize tracing
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let args = Args::parse();

    info!("Starting lrusmoke v{}", env!("CARGO_PKG_VERSION"));

    let cache = run_scenario()?;
    info!("Scenario passed");
    print!("{}", cache);

    if args.ops > 0 {
        info!(
            "Running {} random operations (capacity {}, {} keys, seed {})",
            args.ops, args.capacity, args.keys, args.seed
        );
        let cache = run_random(args.capacity, args.ops, args.keys, args.seed)?;
        let stats = cache.stats();
        info!(
            hits = stats.hits(),
            misses = stats.misses(),
            inserts = stats.inserts(),
            updates = stats.updates(),
            evictions = stats.evictions(),
            "Random workload finished, hit ratio {:.3}",
            stats.hit_ratio()
        );
        print!("{}", cache);
    }

    Ok(())
}

/// Filter from `RUST_LOG` directives, falling back to `info`
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Two-entry walkthrough: touching key 1 makes key 2 the eviction victim
fn run_scenario() -> Result<LruCache<u64, u64>> {
    let mut cache = LruCache::new(2)?;

    cache.set(1, 1);
    info!("set(1, 1)");
    cache.set(2, 2);
    info!("set(2, 2)");

    let value = cache.get(&1).copied();
    info!("get(1) -> {:?}", value);
    ensure!(value == Some(1), "expected get(1) to return 1, got {:?}", value);

    cache.set(3, 3);
    info!("set(3, 3)");
    ensure!(cache.len() == 2, "expected 2 entries, found {}", cache.len());

    let value = cache.get(&2).copied();
    info!("get(2) -> {:?}", value);
    ensure!(value.is_none(), "expected key 2 to be evicted, got {:?}", value);

    let value = cache.get(&3).copied();
    info!("get(3) -> {:?}", value);
    ensure!(value == Some(3), "expected get(3) to return 3, got {:?}", value);

    Ok(cache)
}

/// Even mix of gets and sets over `keys` distinct keys
fn run_random(capacity: usize, ops: usize, keys: u64, seed: u64) -> Result<LruCache<u64, u64>> {
    ensure!(keys > 0, "key space must not be empty");

    let mut cache = LruCache::new(capacity)?;
    let mut rng = StdRng::seed_from_u64(seed);

    for op in 0..ops {
        let key = rng.gen_range(0..keys);
        if rng.gen_bool(0.5) {
            let value = cache.get(&key).copied();
            debug!(op, key, ?value, "get");
        } else {
            let value = rng.gen::<u64>();
            cache.set(key, value);
            debug!(op, key, value, "set");
            ensure!(
                cache.peek(&key) == Some(&value),
                "set({}) was not readable afterwards",
                key
            );
        }
        ensure!(
            cache.len() <= capacity,
            "cache holds {} entries, capacity {}",
            cache.len(),
            capacity
        );
    }

    Ok(cache)
}
