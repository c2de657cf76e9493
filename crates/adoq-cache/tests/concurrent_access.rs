//! Readers racing writers on one session slot

use adoq_cache::{CacheConfig, CacheEntry, CacheOrigin, ResultCache};
use adoq_domain::{SessionId, WorkItem};
use std::sync::Arc;
use std::thread;

fn batch(tag: &str, n: u64) -> CacheEntry {
    let items = (1..=n)
        .map(|i| WorkItem::new(i, "Task", tag, "New"))
        .collect();
    CacheEntry::new(items, CacheOrigin::default(), tag)
}

#[test]
fn test_readers_never_see_mixed_sets() {
    let cache = Arc::new(ResultCache::new(CacheConfig::unlimited()));
    let session = SessionId::new();
    cache.put(session, batch("A", 50));

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for round in 0..200 {
                let (tag, n) = if round % 2 == 0 { ("B", 30) } else { ("A", 50) };
                cache.put(session, batch(tag, n));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..500 {
                    let entry = cache.get(session).expect("entry present");
                    let tag = entry.description().to_string();
                    let expected = if tag == "A" { 50 } else { 30 };
                    assert_eq!(entry.len(), expected);
                    assert!(entry.items().iter().all(|i| i.title == tag));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_put_then_put_returns_second_in_full() {
    let cache = ResultCache::default();
    let session = SessionId::new();
    cache.put(session, batch("A", 10));
    cache.put(session, batch("B", 3));

    let entry = cache.get(session).unwrap();
    assert_eq!(entry.description(), "B");
    assert_eq!(entry.len(), 3);
    assert!(entry.items().iter().all(|i| i.title == "B"));
}
