// End-to-end rebuild tests against mock CT logs
use base64::Engine;
use ct_roots::canonical::canonicalize_certificates;
use ct_roots::ct_log::{
    CtLogClient, EndpointUniverse, LogList, RebuildCoordinator, RetryPolicy, RootsAcquirer,
};
use ct_roots::store::{RootsLookup, RootsStore};
use ct_roots::types::LogId;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALPHA: &str = include_str!("fixtures/alpha.b64");
const BETA: &str = include_str!("fixtures/beta.b64");
const GAMMA: &str = include_str!("fixtures/gamma.b64");

fn log_id(byte: u8) -> LogId {
    LogId::from_bytes([byte; 32])
}

fn roots_body(certs: &[&str]) -> String {
    serde_json::json!({ "certificates": certs.iter().map(|c| c.trim()).collect::<Vec<_>>() })
        .to_string()
}

/// One operator, one untyped log per (path, id)
fn log_list(server: &MockServer, logs: &[(&str, u8)]) -> LogList {
    let engine = base64::engine::general_purpose::STANDARD;
    let logs: Vec<_> = logs
        .iter()
        .map(|(p, id)| {
            serde_json::json!({
                "description": format!("mock log {}", p),
                "log_id": engine.encode([*id; 32]),
                "url": format!("{}/{}/", server.uri(), p),
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "operators": [{ "name": "Mock Operator", "logs": logs }]
    }))
    .unwrap()
}

async fn mount_roots(server: &MockServer, log_path: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/ct/v1/get-roots", log_path)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn coordinator(store: RootsStore) -> RebuildCoordinator {
    let client = CtLogClient::new(Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy {
        max_attempts: 5,
        retry_delay: Duration::from_millis(10),
    };
    RebuildCoordinator::new(RootsAcquirer::new(Arc::new(client), policy, 4), store, false)
}

#[tokio::test]
async fn test_rebuild_end_to_end() {
    let server = MockServer::start().await;

    mount_roots(&server, "a", 200, roots_body(&[ALPHA, BETA])).await;
    mount_roots(&server, "b", 200, roots_body(&[BETA, ALPHA])).await;
    mount_roots(&server, "d", 200, "<html>oops</html>".to_string()).await;
    mount_roots(&server, "e", 200, roots_body(&[GAMMA, "!!not base64!!"])).await;

    // Never answers successfully: exactly max_attempts requests
    Mock::given(method("GET"))
        .and(path("/c/ct/v1/get-roots"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let list = log_list(&server, &[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);
    let universe = EndpointUniverse::from_log_lists([&list]);

    let dir = TempDir::new().unwrap();
    let store = RootsStore::create(dir.path()).await.unwrap();
    let summary = coordinator(store.clone()).run(&universe).await;

    assert_eq!(summary.endpoints, 5);
    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.malformed_documents, 1);
    assert_eq!(summary.skipped_certificates, 1);
    assert_eq!(summary.pointers_written, 3);
    assert_eq!(summary.distinct_blobs(), 2);
    assert_eq!(summary.write_failures, 0);
    assert!(!summary.is_complete());

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.roots_by_hash().len(), 2);

    let hash_a = loaded.hash_by_log()[&log_id(1)];
    let hash_b = loaded.hash_by_log()[&log_id(2)];
    assert_eq!(hash_a, hash_b);

    match loaded.roots_for_log(&log_id(1)) {
        RootsLookup::Found { roots, .. } => assert_eq!(roots.len(), 2),
        other => panic!("expected roots for log a, got {:?}", other),
    }

    // Unreachable and malformed logs get no pointer at all
    assert!(matches!(loaded.roots_for_log(&log_id(3)), RootsLookup::UnknownLog));
    assert!(matches!(loaded.roots_for_log(&log_id(4)), RootsLookup::UnknownLog));

    // The valid certificate survives next to the undecodable one
    match loaded.roots_for_log(&log_id(5)) {
        RootsLookup::Found { roots, .. } => {
            assert_eq!(roots.len(), 1);
            let expected = base64::engine::general_purpose::STANDARD
                .decode(GAMMA.trim())
                .unwrap();
            assert_eq!(roots.iter().next().unwrap().der, expected);
        }
        other => panic!("expected roots for log e, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_log_keeps_previous_pointer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down/ct/v1/get-roots"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = RootsStore::create(dir.path()).await.unwrap();

    let previous = canonicalize_certificates(vec![ALPHA.trim().to_string()], "previous run");
    store.write(&log_id(9), &previous).await.unwrap();

    let list = log_list(&server, &[("down", 9)]);
    let universe = EndpointUniverse::from_log_lists([&list]);
    let summary = coordinator(store.clone()).run(&universe).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.pointers_written, 0);

    let loaded = store.load().await.unwrap();
    match loaded.roots_for_log(&log_id(9)) {
        RootsLookup::Found { hash, roots } => {
            assert_eq!(hash, previous.hash);
            assert_eq!(roots.len(), 1);
        }
        other => panic!("expected previous roots, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_certificate_does_not_break_store() {
    let server = MockServer::start().await;
    mount_roots(&server, "good", 200, roots_body(&[ALPHA])).await;
    mount_roots(&server, "junk", 200, roots_body(&["QQ=="])).await;

    let dir = TempDir::new().unwrap();
    let store = RootsStore::create(dir.path()).await.unwrap();

    let list = log_list(&server, &[("good", 1), ("junk", 2)]);
    let summary = coordinator(store.clone())
        .run(&EndpointUniverse::from_log_lists([&list]))
        .await;
    assert_eq!(summary.skipped_certificates, 1);
    assert_eq!(summary.pointers_written, 2);
    assert_eq!(summary.write_failures, 0);

    let loaded = store.load().await.unwrap();
    match loaded.roots_for_log(&log_id(1)) {
        RootsLookup::Found { roots, .. } => assert_eq!(roots.len(), 1),
        other => panic!("expected roots for good log, got {:?}", other),
    }
    match loaded.roots_for_log(&log_id(2)) {
        RootsLookup::Found { roots, .. } => assert!(roots.is_empty()),
        other => panic!("expected empty roots for junk log, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_root_list_is_stored() {
    let server = MockServer::start().await;
    mount_roots(&server, "empty", 200, roots_body(&[])).await;

    let dir = TempDir::new().unwrap();
    let store = RootsStore::create(dir.path()).await.unwrap();

    let list = log_list(&server, &[("empty", 6)]);
    let summary = coordinator(store.clone())
        .run(&EndpointUniverse::from_log_lists([&list]))
        .await;
    assert!(summary.is_complete());
    assert_eq!(summary.pointers_written, 1);

    let loaded = store.load().await.unwrap();
    match loaded.roots_for_log(&log_id(6)) {
        RootsLookup::Found { roots, .. } => assert!(roots.is_empty()),
        other => panic!("expected an empty root list, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rebuild_twice_is_idempotent() {
    let server = MockServer::start().await;
    mount_roots(&server, "a", 200, roots_body(&[ALPHA, BETA])).await;

    let dir = TempDir::new().unwrap();
    let store = RootsStore::create(dir.path()).await.unwrap();
    let list = log_list(&server, &[("a", 1)]);
    let universe = EndpointUniverse::from_log_lists([&list]);

    coordinator(store.clone()).run(&universe).await;
    let hash = store.load().await.unwrap().hash_by_log()[&log_id(1)];
    let first = std::fs::read(store.blob_path(&hash)).unwrap();

    coordinator(store.clone()).run(&universe).await;
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.hash_by_log()[&log_id(1)], hash);
    assert_eq!(std::fs::read(store.blob_path(&hash)).unwrap(), first);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
