use cam_probe_rs::report::ReportStore;
use cam_probe_rs::types::ProbeResult;

fn result_with_note(ip: &str, note: &str) -> ProbeResult {
    let mut r = ProbeResult::new(ip);
    r.notes.push(note.to_string());
    r
}

#[tokio::test]
async fn reprobing_replaces_the_same_ip_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("identify_report.json"));

    let first = result_with_note("192.168.1.10", "first run");
    let second = result_with_note("192.168.1.10", "second run");
    store.merge(&first).await.unwrap();
    store.merge(&second).await.unwrap();

    let entries = store.load().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], second);
}

#[tokio::test]
async fn entries_for_distinct_ips_keep_run_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("identify_report.json"));

    store.merge(&ProbeResult::new("10.0.0.1")).await.unwrap();
    store.merge(&ProbeResult::new("10.0.0.2")).await.unwrap();
    store.merge(&ProbeResult::new("10.0.0.3")).await.unwrap();
    // Re-probing the first target moves it to the end, as the most recent run.
    store.merge(&ProbeResult::new("10.0.0.1")).await.unwrap();

    let ips: Vec<String> = store.load().await.into_iter().map(|r| r.ip).collect();
    assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3", "10.0.0.1"]);
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("identify_report.json"));
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn corrupt_file_is_tolerated_and_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identify_report.json");
    std::fs::write(&path, "{ not json ]").unwrap();

    let store = ReportStore::new(&path);
    assert!(store.load().await.is_empty());

    store.merge(&ProbeResult::new("10.0.0.9")).await.unwrap();
    let entries = store.load().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].ip, "10.0.0.9");
}

#[tokio::test]
async fn concurrent_completions_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(ReportStore::new(dir.path().join("identify_report.json")));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.merge(&ProbeResult::new(format!("10.0.1.{i}"))).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let entries = store.load().await;
    assert_eq!(entries.len(), 8);
}
