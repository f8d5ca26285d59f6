use crate::{ManualClock, SessionConfig, SessionStore, Token};
use core::time::Duration;
use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex};
use std::thread::scope;

const TIMEOUT: Duration = Duration::from_secs(600);
const JUST_PAST_TIMEOUT: Duration = Duration::from_millis(600_001);

fn store_with(shards: usize) -> (SessionStore<ManualClock>, ManualClock) {
    let clock = ManualClock::new(1_000);
    let config = SessionConfig::default()
        .with_idle_timeout(TIMEOUT)
        .with_shard_count(shards);
    let store = SessionStore::new(config, clock.clone()).unwrap();
    (store, clock)
}

fn store() -> (SessionStore<ManualClock>, ManualClock) {
    store_with(4)
}

#[test]
fn same_token_within_idle_window() {
    let (store, clock) = store();
    let first = store.get_or_create_session(1234);
    clock.advance(Duration::from_secs(599));
    let second = store.get_or_create_session(1234);

    assert_eq!(first, second);
    assert_eq!(store.find_customer_id(&first), Some(1234));
    assert_eq!(store.len(), 1);
}

#[test]
fn new_token_after_idle_window_and_old_one_is_forgotten() {
    let (store, clock) = store();
    let first = store.get_or_create_session(1234);
    clock.advance(JUST_PAST_TIMEOUT);
    let second = store.get_or_create_session(1234);

    assert_ne!(first, second);
    assert_eq!(store.find_customer_id(&first), None);
    assert!(!store.contains_token(&first));
    assert_eq!(store.find_customer_id(&second), Some(1234));
    assert_eq!(store.len(), 1);
}

#[test]
fn expiry_is_strict() {
    let (store, clock) = store();
    let token = store.get_or_create_session(7);
    clock.advance(TIMEOUT);
    assert_eq!(store.find_customer_id(&token), Some(7));

    clock.advance(JUST_PAST_TIMEOUT);
    assert_eq!(store.find_customer_id(&token), None);
}

#[test]
fn lookups_slide_the_idle_window() {
    let (store, clock) = store();
    let token = store.get_or_create_session(42);
    for _ in 0..5 {
        clock.advance(Duration::from_secs(500));
        assert_eq!(store.validate(token.as_str()), Some(42));
    }
    assert_eq!(store.get_or_create_session(42), token);
}

#[test]
fn distinct_customers_get_distinct_tokens() {
    let (store, _clock) = store();
    let tokens: HashSet<Token> = (0..1_000).map(|id| store.get_or_create_session(id)).collect();
    assert_eq!(tokens.len(), 1_000);
    for token in &tokens {
        assert!(store.find_customer_id(token).is_some());
    }
}

#[test]
fn unknown_or_malformed_tokens_resolve_to_nothing() {
    let (store, _clock) = store();
    store.get_or_create_session(1);

    assert_eq!(store.validate(""), None);
    assert_eq!(store.validate("short"), None);
    assert_eq!(store.validate("toolongtoken"), None);
    assert_eq!(store.validate("0OIl0OIl"), None);
    assert_eq!(store.validate("22222222"), None);
}

#[test]
fn sweep_evicts_session_and_reverse_entry() {
    let (store, clock) = store();
    let stale = store.get_or_create_session(1);
    let other = store.get_or_create_session(2);
    clock.advance(Duration::from_secs(300));
    store.get_or_create_session(2);
    clock.advance(Duration::from_secs(301));

    assert_eq!(store.sweep_all(), 1);
    assert!(!store.contains_token(&stale));
    assert!(store.contains_token(&other));
    assert_eq!(store.len(), 1);

    // The customer starts over with a new token.
    let fresh = store.get_or_create_session(1);
    assert_ne!(fresh, stale);
    assert_eq!(store.find_customer_id(&fresh), Some(1));
}

#[test]
fn sweep_visits_shards_round_robin() {
    let (store, _clock) = store_with(3);
    let visited: Vec<usize> = (0..7).map(|_| store.sweep_next_shard().shard).collect();
    assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn sweep_leaves_live_sessions_alone() {
    let (store, clock) = store_with(1);
    let token = store.get_or_create_session(9);
    clock.advance(TIMEOUT);

    let report = store.sweep_next_shard();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.removed, 0);
    assert_eq!(store.find_customer_id(&token), Some(9));
}

#[test]
fn concurrent_creation_yields_one_token() {
    const THREADS: usize = 64;

    let (store, _clock) = store();
    let barrier = Barrier::new(THREADS);
    let seen = Mutex::new(HashSet::new());

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                let token = store.get_or_create_session(555);
                seen.lock().unwrap().insert(token);
            });
        }
    });

    assert_eq!(seen.into_inner().unwrap().len(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn concurrent_recreation_after_expiry_yields_one_token() {
    const THREADS: usize = 32;

    let (store, clock) = store();
    let stale = store.get_or_create_session(77);
    clock.advance(JUST_PAST_TIMEOUT);

    let barrier = Barrier::new(THREADS);
    let seen = Mutex::new(HashSet::new());
    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                seen.lock().unwrap().insert(store.get_or_create_session(77));
            });
        }
    });

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(!seen.contains(&stale));
    assert!(!store.contains_token(&stale));
}

#[test]
fn sweep_racing_lookups_never_revives_an_expired_session() {
    const READERS: usize = 8;

    let (store, clock) = store_with(1);
    let token = store.get_or_create_session(3);
    clock.advance(JUST_PAST_TIMEOUT);

    let barrier = Barrier::new(READERS + 1);
    scope(|s| {
        for _ in 0..READERS {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..1_000 {
                    assert_eq!(store.find_customer_id(&token), None);
                }
            });
        }
        s.spawn(|| {
            barrier.wait();
            store.sweep_all();
        });
    });

    assert!(store.is_empty());
    assert!(!store.contains_token(&token));
}

#[test]
fn background_sweeper_evicts_expired_sessions() {
    let clock = ManualClock::new(0);
    let config = SessionConfig::default()
        .with_idle_timeout(Duration::from_millis(10))
        .with_sweep_interval(Duration::from_millis(1))
        .with_shard_count(2);
    let store = Arc::new(SessionStore::new(config, clock.clone()).unwrap());
    let token = store.get_or_create_session(11);
    clock.advance(Duration::from_millis(11));

    let sweeper = store.spawn_sweeper().unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while store.contains_token(&token) && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    sweeper.stop();

    assert!(!store.contains_token(&token));
    assert!(store.is_empty());
}

#[test]
fn sweeper_exits_when_store_is_dropped() {
    let config = SessionConfig::default().with_sweep_interval(Duration::from_millis(1));
    let store = Arc::new(SessionStore::new(config, ManualClock::new(0)).unwrap());
    let sweeper = store.spawn_sweeper().unwrap();
    drop(store);
    // Joins without hanging.
    drop(sweeper);
}
