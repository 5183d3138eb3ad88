use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use brent_hash::HashMap as BrentHashMap;
use brent_hash::HashTable as BrentHashTable;
use brent_hash::InternTable;
use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownHashMap;
use hashbrown::HashSet as HashbrownHashSet;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_items<TestItem: KeyValuePair>(count: usize) -> Vec<(u64, TestItem)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let key = rng.try_next_u64().unwrap();
            let item = TestItem::new(key);
            let hash = item.hash_key();
            (hash, item)
        })
        .collect()
}

fn brent_table<TestItem: KeyValuePair>(items: &[(u64, TestItem)]) -> BrentHashTable<TestItem, ()> {
    let mut table = BrentHashTable::new();
    for (hash, item) in items.iter().cloned() {
        let probe = item.clone();
        table.insert(hash as usize, item, (), |v| v.eq_key(&probe));
    }
    table
}

fn hashbrown_table<TestItem: KeyValuePair>(items: &[(u64, TestItem)]) -> HashbrownHashTable<TestItem> {
    let mut table = HashbrownHashTable::new();
    for (hash, item) in items.iter().cloned() {
        table.insert_unique(hash, item, |v| v.hash_key());
    }
    table
}

fn bench_insert_random<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = BrentHashTable::<TestItem, ()>::new();
                    for (hash, item) in hash_and_item {
                        black_box(table.try_insert_unique(hash as usize, item, ()).is_ok());
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = HashbrownHashTable::<TestItem>::new();
                    for (hash, item) in hash_and_item {
                        black_box(table.insert_unique(hash, item, |v| v.hash_key()));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let present = random_items::<TestItem>(*size);
        let absent = random_items::<TestItem>(*size);
        let brent = brent_table(&present);
        let hashbrown = hashbrown_table(&present);

        let mut probes = present.iter().chain(absent.iter()).cloned().collect::<Vec<_>>();
        probes.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter(|| {
                for (hash, item) in probes.iter() {
                    black_box(brent.find(*hash as usize, |v| v.eq_key(item)));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, item) in probes.iter() {
                    black_box(hashbrown.find(*hash, |v| v.eq_key(item)));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "remove_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        let brent = brent_table(&hash_and_item);
        let hashbrown = hashbrown_table(&hash_and_item);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter_batched(
                || brent.clone(),
                |mut table| {
                    for (hash, item) in hash_and_item.iter() {
                        black_box(table.remove(*hash as usize, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || hashbrown.clone(),
                |mut table| {
                    for (hash, item) in hash_and_item.iter() {
                        if let Ok(entry) = table.find_entry(*hash, |v| v.eq_key(item)) {
                            black_box(entry.remove().0);
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "iteration_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        let brent = brent_table(&hash_and_item);
        let hashbrown = hashbrown_table(&hash_and_item);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter(|| {
                for item in brent.iter() {
                    black_box(item);
                }
            })
        });

        group.bench_function(format!("brent_hash_cursor/{size}"), |b| {
            b.iter(|| {
                let mut cursor = brent.next_index(None);
                while let Some(index) = cursor {
                    black_box(brent.get_index(index));
                    cursor = brent.next_index(Some(index));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for item in hashbrown.iter() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

fn bench_identity_map<const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity_map");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let objects = (0..*size as u64).map(Box::new).collect::<Vec<_>>();
        let mut handles = objects.iter().map(|b| &**b).collect::<Vec<&u64>>();
        handles.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter(|| {
                let mut map = BrentHashMap::new();
                for &handle in handles.iter() {
                    map.insert(handle, *handle);
                }
                for &handle in handles.iter() {
                    black_box(map.get(handle));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut map = HashbrownHashMap::new();
                for &handle in handles.iter() {
                    map.insert(handle as *const u64 as usize, *handle);
                }
                for &handle in handles.iter() {
                    black_box(map.get(&(handle as *const u64 as usize)));
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_intern<const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        // Every word appears four times.
        let mut words = (0..*size)
            .map(|i| format!("identifier_{}", i / 4).into_bytes())
            .collect::<Vec<_>>();
        words.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("brent_hash/{size}"), |b| {
            b.iter(|| {
                let interner = InternTable::new();
                for word in words.iter() {
                    black_box(interner.intern_copy(word));
                }
                black_box(interner.len())
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut interner = HashbrownHashSet::<Box<[u8]>>::new();
                for word in words.iter() {
                    if !interner.contains(&word[..]) {
                        interner.insert(word.clone().into_boxed_slice());
                    }
                    black_box(interner.get(&word[..]));
                }
                black_box(interner.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 4>,
    bench_insert_random::<TestItem, 4>,
    bench_find_hit_miss::<SmallTestItem, 4>,
    bench_find_hit_miss::<TestItem, 4>,
    bench_remove::<SmallTestItem, 4>,
    bench_remove::<TestItem, 4>,
    bench_iteration::<SmallTestItem, 4>,
    bench_iteration::<TestItem, 4>,
    bench_identity_map::<4>,
    bench_intern::<3>,
);

criterion_main!(benches);
