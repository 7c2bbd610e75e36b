use bytes::Bytes;
use hamster::*;

// Parse a client head, derive the key, and run it through the cache.
#[tokio::test]
async fn test_full_request_cycle() {
    let cache = ObjectCache::new();

    let head = b"GET http://origin.test:9000/a HTTP/1.1\r\nHost: origin.test:9000\r\nAccept: */*\r\n\r\n";
    let parsed = parse_request(head).expect("head should parse");

    assert_eq!(parsed.hostname, "origin.test");
    assert_eq!(parsed.port, "9000");
    assert_eq!(parsed.path, "/a");
    assert_eq!(parsed.extra_headers, "Accept: */*\r\n");

    let key = object_key(&parsed.hostname, &parsed.port, &parsed.path);
    let response = Bytes::from_static(b"HTTP/1.0 200 OK\r\n\r\nbody");

    assert!(cache.insert(key, response.clone()).await);
    assert_eq!(cache.get(key).await, Some(response));
}

// The key canonicalizes the default port, so the explicit and implicit
// spellings of port 80 share a slot.
#[test]
fn test_default_port_spellings_share_a_key() {
    let (host_a, port_a, path_a) = split_uri("http://example.com/x");
    let (host_b, port_b, path_b) = split_uri("http://example.com:80/x");

    assert_eq!(
        object_key(&host_a, &port_a, &path_a),
        object_key(&host_b, &port_b, &path_b)
    );
}

// Insert-then-get round trip: the bytes come back unchanged.
#[tokio::test]
async fn test_insert_then_get_round_trip() {
    let cache = ObjectCache::new();
    let key = object_key("test.com", "80", "/roundtrip");
    let body = Bytes::from((0..=255u8).cycle().take(4096).collect::<Vec<u8>>());

    assert!(cache.insert(key, body.clone()).await);

    let cached = cache.get(key).await.expect("entry should be present");
    assert_eq!(cached, body);
    assert_eq!(cached.len(), 4096);
}

// Idempotent re-insert: one live entry, byte counter grows by one size.
#[tokio::test]
async fn test_idempotent_reinsert() {
    let cache = ObjectCache::new();
    let key = object_key("test.com", "80", "/again");
    let body = Bytes::from(vec![7u8; 512]);

    assert!(cache.insert(key, body.clone()).await);
    assert!(cache.insert(key, body.clone()).await);

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.total_bytes().await, 512);
}

// Eviction ordering: fill with k1..k10 of 100 KiB each, then k11 pushes the
// total past the budget and k1 goes first.
#[tokio::test]
async fn test_eviction_ordering_under_pressure() {
    let cache = ObjectCache::new();
    let size = 100 * 1024;

    let keys: Vec<u64> = (1..=11)
        .map(|i| object_key("test.com", "80", &format!("/k{i}")))
        .collect();

    for key in &keys[..10] {
        assert!(cache.insert(*key, Bytes::from(vec![0u8; size])).await);
    }
    assert_eq!(cache.len().await, 10);
    assert_eq!(cache.total_bytes().await, 10 * size);

    assert!(cache.insert(keys[10], Bytes::from(vec![0u8; size])).await);

    assert!(cache.get(keys[0]).await.is_none(), "k1 must be evicted first");
    for key in &keys[1..] {
        assert!(cache.get(*key).await.is_some());
    }
    assert!(cache.total_bytes().await <= MAX_CACHE_SIZE);
}

// Size guards: empty and over-cap objects never land.
#[tokio::test]
async fn test_size_guards() {
    let cache = ObjectCache::new();

    assert!(!cache.insert(1, Bytes::new()).await);
    assert!(!cache.insert(2, Bytes::from(vec![0u8; MAX_OBJECT_SIZE + 1])).await);

    assert!(cache.is_empty().await);
    assert_eq!(cache.total_bytes().await, 0);
}

// Concurrent workers hammering the cache leave it consistent.
#[tokio::test]
async fn test_concurrent_cache_access() {
    use std::sync::Arc;
    use tokio::task;

    let cache = Arc::new(ObjectCache::new());
    let mut handles = vec![];

    for i in 0..50u64 {
        let cache = cache.clone();
        handles.push(task::spawn(async move {
            let key = object_key(&format!("test{i}.com"), "80", "/");
            let body = Bytes::from(format!("body{i}"));
            for _ in 0..10 {
                assert!(cache.insert(key, body.clone()).await);
                assert_eq!(cache.get(key).await, Some(body.clone()));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await, 50);
    assert!(cache.total_bytes().await <= MAX_CACHE_SIZE);
}

// Two writers racing on one key: last writer wins, one live entry remains.
#[tokio::test]
async fn test_same_key_race_last_writer_wins() {
    use std::sync::Arc;
    use tokio::task;

    let cache = Arc::new(ObjectCache::new());
    let key = object_key("race.test", "80", "/x");

    let mut handles = vec![];
    for i in 0..10u8 {
        let cache = cache.clone();
        handles.push(task::spawn(async move {
            cache.insert(key, Bytes::from(vec![i; 64])).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.total_bytes().await, 64);
    assert!(cache.get(key).await.is_some());
}
