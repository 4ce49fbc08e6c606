use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, PlotConfiguration};
use moka::sync::Cache as MokaCache;
use policy_cache::{ArcCache, CachePolicy, LfuCache, LruCache, ShardedLfuCache, ShardedLruCache};
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREAD_COUNT: usize = 8;
const OPERATIONS_PER_THREAD: usize = 50_000;

#[derive(Clone)]
struct BenchConfig {
    name: String,
    cache_size: usize,
    key_space: usize,
    write_ratio: usize, // Number of write operations per 10 operations
}

impl BenchConfig {
    fn new(name: &str, cache_size: usize, key_space: usize, write_ratio: usize) -> Self {
        Self {
            name: name.to_string(),
            cache_size,
            key_space,
            write_ratio,
        }
    }
}

fn get_cache_size_configs() -> Vec<BenchConfig> {
    vec![
        BenchConfig::new("1K", 1_000, 10_000, 5),
        BenchConfig::new("10K", 10_000, 10_000, 5),
        BenchConfig::new("50K", 50_000, 10_000, 5),
    ]
}

fn get_write_ratio_configs() -> Vec<BenchConfig> {
    vec![
        BenchConfig::new("10% writes", 10_000, 20_000, 1),
        BenchConfig::new("50% writes", 10_000, 20_000, 5),
        BenchConfig::new("80% writes", 10_000, 20_000, 8),
    ]
}

#[derive(Clone, Copy)]
enum CacheType {
    Lru,
    Lfu,
    Arc,
    ShardedLru,
    ShardedLfu,
    Moka,
}

impl CacheType {
    const ALL: [CacheType; 6] = [
        CacheType::Lru,
        CacheType::Lfu,
        CacheType::Arc,
        CacheType::ShardedLru,
        CacheType::ShardedLfu,
        CacheType::Moka,
    ];

    fn label(self) -> &'static str {
        match self {
            CacheType::Lru => "LRU",
            CacheType::Lfu => "LFU",
            CacheType::Arc => "ARC",
            CacheType::ShardedLru => "Sharded LRU",
            CacheType::ShardedLfu => "Sharded LFU",
            CacheType::Moka => "Moka",
        }
    }

    fn build(self, capacity: usize) -> Arc<dyn CachePolicy<u64, u64>> {
        match self {
            CacheType::Lru => Arc::new(LruCache::<u64, u64>::new(capacity)),
            CacheType::Lfu => Arc::new(LfuCache::<u64, u64>::new(capacity)),
            CacheType::Arc => Arc::new(ArcCache::<u64, u64>::new(capacity, 2)),
            CacheType::ShardedLru => Arc::new(ShardedLruCache::<u64, u64>::new(capacity, 0)),
            CacheType::ShardedLfu => Arc::new(ShardedLfuCache::<u64, u64>::new(capacity, 0, 10)),
            CacheType::Moka => Arc::new(MokaPolicy(MokaCache::new(capacity as u64))),
        }
    }
}

// Lets moka run through the same harness as the crate's own policies.
struct MokaPolicy(MokaCache<u64, u64>);

impl CachePolicy<u64, u64> for MokaPolicy {
    fn put(&self, key: u64, value: u64) {
        self.0.insert(key, value);
    }

    fn get(&self, key: &u64) -> Option<u64> {
        self.0.get(key)
    }

    fn len(&self) -> usize {
        self.0.entry_count() as usize
    }

    fn capacity(&self) -> usize {
        self.0.policy().max_capacity().unwrap_or(0) as usize
    }
}

fn bench_cache(cache_type: CacheType, config: &BenchConfig) -> Duration {
    let cache = cache_type.build(config.cache_size);
    // Pre-populate with half of the key space
    for key in 0..(config.key_space / 2) as u64 {
        cache.put(key, key);
    }

    let start = std::time::Instant::now();
    let mut handles = vec![];

    for _ in 0..THREAD_COUNT {
        let cache = Arc::clone(&cache);
        let config = config.clone();
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for i in 0..OPERATIONS_PER_THREAD {
                let key = rng.gen_range(0..config.key_space as u64);
                if i % 10 < config.write_ratio {
                    cache.put(key, key);
                } else {
                    let _ = cache.get(&key);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    start.elapsed()
}

fn run_benchmark_group(c: &mut Criterion, name: &str, configs: Vec<BenchConfig>) {
    let plot_config = PlotConfiguration::default().summary_scale(criterion::AxisScale::Linear);

    let mut group = c.benchmark_group(name);
    group.plot_config(plot_config);
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    for config in configs.iter() {
        for cache_type in CacheType::ALL {
            group.bench_with_input(
                BenchmarkId::new(cache_type.label(), &config.name),
                config,
                |b, config| {
                    b.iter(|| bench_cache(cache_type, config));
                },
            );
        }
    }
    group.finish();
}

fn concurrent_benchmark(c: &mut Criterion) {
    run_benchmark_group(c, "Cache Size Impact", get_cache_size_configs());
    run_benchmark_group(c, "Write Ratio Impact", get_write_ratio_configs());
}

criterion_group!(benches, concurrent_benchmark);
criterion_main!(benches);
