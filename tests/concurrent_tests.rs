//! Concurrent/multi-threaded tests
//!
//! These exercise real thread interleavings:
//!
//! 1. **First-committer-wins** - racing read-modify-writes resolve to one
//!    winner
//! 2. **Blind writes** - concurrent write-only transactions never conflict
//! 3. **Parallel disjoint commits** - no false conflicts, exact accounting
//! 4. **Bank-transfer conservation** - the total is preserved under heavy
//!    contention, as observed by a concurrent read-only summer
//! 5. **History hygiene** - the garbage collector drains history after load

use optikv::{retry_with, Db, DbConfig, Error, RetryConfig};
use rand::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn shared_db<V: Clone + Send + Sync + 'static>() -> Arc<Db<i64, V>> {
    Arc::new(Db::with_config(
        DbConfig::new().with_gc_interval(Duration::from_millis(5)),
    ))
}

fn contended_retry() -> RetryConfig {
    RetryConfig::new()
        .with_max_retries(1000)
        .with_base_delay(Duration::from_micros(500))
        .with_backoff_factor(1.2)
        .with_max_delay(Duration::from_millis(50))
}

// ============================================================================
// SECTION 1: First-committer-wins
// ============================================================================

#[test]
fn racing_read_modify_writes_have_one_winner() {
    let db: Arc<Db<i64, i64>> = shared_db();
    let barrier = Arc::new(Barrier::new(2));
    let successes = Arc::new(AtomicUsize::new(0));
    let conflicts = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            let conflicts = Arc::clone(&conflicts);
            thread::spawn(move || {
                let mut txn = db.begin();
                let _ = txn.get(&0);
                // Both transactions hold their snapshot before either
                // commits.
                barrier.wait();
                txn.put(0, i);
                match txn.commit() {
                    Ok(()) => successes.fetch_add(1, Ordering::Relaxed),
                    Err(e) => {
                        assert!(e.is_conflict());
                        conflicts.fetch_add(1, Ordering::Relaxed)
                    }
                };
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::Relaxed), 1);
    assert_eq!(conflicts.load(Ordering::Relaxed), 1);
}

#[test]
fn racing_blind_writes_both_commit() {
    let db: Arc<Db<i64, i64>> = shared_db();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut txn = db.begin();
                txn.put(0, i);
                barrier.wait();
                txn.commit()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let stats = db.stats();
    assert_eq!(stats.committed, 2);
    assert_eq!(stats.aborted, 0);
}

// ============================================================================
// SECTION 2: Parallel disjoint commits
// ============================================================================

#[test]
fn disjoint_commits_never_conflict() {
    const THREADS: i64 = 8;
    const TXNS_PER_THREAD: i64 = 200;

    let db: Arc<Db<i64, i64>> = shared_db();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for j in 0..TXNS_PER_THREAD {
                    let key = t * TXNS_PER_THREAD + j;
                    let mut txn = db.begin();
                    assert_eq!(txn.get(&key), None);
                    txn.put(key, key);
                    txn.commit().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = db.stats();
    assert_eq!(stats.committed, (THREADS * TXNS_PER_THREAD) as u64);
    assert_eq!(stats.aborted, 0);
    assert_eq!(stats.num_keys, (THREADS * TXNS_PER_THREAD) as usize);
}

// ============================================================================
// SECTION 3: Bank-transfer conservation
// ============================================================================

const NUM_ACCOUNTS: i64 = 10;

fn read_total(db: &Db<i64, i64>) -> i64 {
    retry_with(db, &contended_retry(), |txn| {
        let mut total = 0;
        for account in 0..NUM_ACCOUNTS {
            total += txn.get(&account).expect("account exists");
        }
        Ok::<_, Error>(total)
    })
    .expect("sum transaction exhausted its retries")
}

#[test]
fn transfers_preserve_the_total() {
    const THREADS: usize = 10;
    const TRANSFERS_PER_THREAD: usize = 1000;

    let db: Arc<Db<i64, i64>> = shared_db();

    // Seed the accounts with random balances in a single transaction.
    let expected_total: i64 = {
        let mut rng = rand::thread_rng();
        let mut setup = db.begin();
        let mut total = 0;
        for account in 0..NUM_ACCOUNTS {
            let balance = rng.gen_range(1..=100);
            total += balance;
            setup.put(account, balance);
        }
        setup.commit().unwrap();
        total
    };
    assert_eq!(read_total(&db), expected_total);

    // A read-only summer races the transfer threads; every sum it observes
    // must equal the seeded total.
    let stop = Arc::new(AtomicBool::new(false));
    let summer = {
        let db = Arc::clone(&db);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                assert_eq!(read_total(&db), expected_total);
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let transferers: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let config = contended_retry();
                for _ in 0..TRANSFERS_PER_THREAD {
                    let from = rng.gen_range(0..NUM_ACCOUNTS);
                    let mut to = rng.gen_range(0..NUM_ACCOUNTS);
                    while to == from {
                        to = rng.gen_range(0..NUM_ACCOUNTS);
                    }
                    let amount_seed: i64 = rng.gen_range(0..i64::MAX);

                    retry_with(&db, &config, |txn| {
                        let from_balance = txn.get(&from).expect("account exists");
                        let to_balance = txn.get(&to).expect("account exists");
                        let amount = if from_balance > 0 {
                            amount_seed % from_balance
                        } else {
                            0
                        };
                        txn.put(from, from_balance - amount);
                        txn.put(to, to_balance + amount);
                        Ok::<_, Error>(())
                    })
                    .expect("transfer exhausted its retries");
                }
            })
        })
        .collect();
    for handle in transferers {
        handle.join().unwrap();
    }

    stop.store(true, Ordering::Relaxed);
    summer.join().unwrap();

    assert_eq!(read_total(&db), expected_total);
    let stats = db.stats();
    assert!(stats.committed >= (THREADS * TRANSFERS_PER_THREAD) as u64);
}

// ============================================================================
// SECTION 4: Randomized workload (write-then-read smoke)
// ============================================================================

#[test]
fn random_put_get_workload() {
    const THREADS: usize = 5;
    const TXNS_PER_THREAD: usize = 500;

    let db: Arc<Db<i64, i64>> = shared_db();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let config = contended_retry();
                for _ in 0..TXNS_PER_THREAD {
                    let key = rng.gen_range(0..1000);
                    let value: i64 = rng.gen();
                    retry_with(&db, &config, |txn| {
                        txn.put(key, value);
                        // Read-your-writes inside the same transaction.
                        assert_eq!(txn.get(&key), Some(value));
                        Ok::<_, Error>(())
                    })
                    .expect("workload transaction exhausted its retries");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Each retry loop commits exactly once, no matter how many attempts
    // conflicted along the way.
    assert_eq!(db.stats().committed, (THREADS * TXNS_PER_THREAD) as u64);
}

// ============================================================================
// SECTION 5: History hygiene under load
// ============================================================================

#[test]
fn history_drains_after_parallel_load() {
    const THREADS: i64 = 8;
    const TXNS_PER_THREAD: i64 = 100;

    let db: Arc<Db<i64, i64>> = shared_db();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for j in 0..TXNS_PER_THREAD {
                    let mut txn = db.begin();
                    txn.put(t * TXNS_PER_THREAD + j, 0);
                    txn.commit().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // With no live transactions left, every record becomes reclaimable.
    thread::sleep(Duration::from_millis(100));
    let stats = db.stats();
    assert_eq!(stats.history_len, 0);
    assert_eq!(stats.pruned, (THREADS * TXNS_PER_THREAD) as u64);
}
