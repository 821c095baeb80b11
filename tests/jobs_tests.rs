use std::sync::Arc;
use std::time::Duration;

use cam_probe_rs::jobs::Jobs;
use cam_probe_rs::probe::{ProbeConfig, Prober};
use cam_probe_rs::report::ReportStore;
use cam_probe_rs::types::{JobStatus, ProbeResult};

#[test]
fn unknown_job_polls_none() {
    let jobs = Jobs::new();
    assert!(jobs.poll("nonexistent-id").is_none());
}

#[test]
fn new_job_starts_running_at_zero() {
    let jobs = Jobs::new();
    let id = jobs.create("192.168.1.10");
    let job = jobs.poll(&id).expect("job exists");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.progress, 0);
    assert_eq!(job.ip, "192.168.1.10");
    assert!(job.result.is_none() && job.error.is_none());
}

#[test]
fn progress_clamps_and_never_moves_backwards() {
    let jobs = Jobs::new();
    let id = jobs.create("10.0.0.5");
    jobs.report_progress(&id, 50, "halfway");
    jobs.report_progress(&id, 40, "late message");
    assert_eq!(jobs.poll(&id).unwrap().progress, 50);
    jobs.report_progress(&id, 255, "overshoot");
    assert_eq!(jobs.poll(&id).unwrap().progress, 100);
}

#[test]
fn line_buffer_keeps_most_recent_ten() {
    let jobs = Jobs::new();
    let id = jobs.create("10.0.0.5");
    for i in 1..=15 {
        jobs.report_progress(&id, i as u8, &format!("message {i}"));
    }
    let lines = jobs.poll(&id).unwrap().lines;
    assert_eq!(lines.len(), 10);
    assert_eq!(lines.first().map(String::as_str), Some("message 6"));
    assert_eq!(lines.last().map(String::as_str), Some("message 15"));
}

#[test]
fn finish_is_terminal() {
    let jobs = Jobs::new();
    let id = jobs.create("10.0.0.5");
    jobs.finish(&id, ProbeResult::new("10.0.0.5"));

    let job = jobs.poll(&id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert!(job.result.is_some());
    assert!(job.error.is_none());

    // Neither progress updates nor a late failure move a terminal job.
    jobs.report_progress(&id, 10, "too late");
    jobs.fail(&id, "too late");
    let job = jobs.poll(&id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert!(job.lines.iter().all(|l| l != "too late"));
}

#[test]
fn fail_records_error_only() {
    let jobs = Jobs::new();
    let id = jobs.create("10.0.0.5");
    jobs.fail(&id, "filesystem write failed");
    let job = jobs.poll(&id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("filesystem write failed"));
    assert!(job.result.is_none());
}

#[test]
fn job_ids_are_unique() {
    let jobs = Jobs::new();
    let a = jobs.create("10.0.0.5");
    let b = jobs.create("10.0.0.5");
    assert_ne!(a, b);
}

/// A started job against a target with nothing listening still reaches
/// `done` with an empty-valued result, never `error`.
#[tokio::test(flavor = "multi_thread")]
async fn started_job_reaches_done_when_every_attempt_fails() {
    let dir = tempfile::tempdir().unwrap();
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
        // listener drops here, leaving the port closed
    };

    let mut cfg = ProbeConfig::new(dir.path().join("snaps"));
    cfg.probe_ports = vec![closed_port];
    cfg.http_header_ports = vec![closed_port];
    cfg.https_header_ports = vec![];
    cfg.snapshot_paths = vec!["/snapshot.jpg".to_string()];
    cfg.snapshot_http_port = Some(closed_port);
    cfg.rtsp_templates = vec![];
    cfg.enable_onvif = false;
    cfg.connect_timeout = Duration::from_millis(200);
    cfg.header_timeout = Duration::from_millis(200);
    cfg.snapshot_timeout = Duration::from_millis(200);

    let prober = Arc::new(Prober::new(cfg).unwrap());
    let store = Arc::new(ReportStore::new(dir.path().join("identify_report.json")));
    let jobs = Jobs::new();

    let id = jobs.start(prober, store, "127.0.0.1".to_string(), None);

    let mut job = jobs.poll(&id).expect("job exists immediately");
    for _ in 0..200 {
        if job.status != JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        job = jobs.poll(&id).unwrap();
    }

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert!(job.lines.len() <= 10);
    let result = job.result.expect("done job carries a result");
    assert!(result.open_ports.is_empty());
    assert!(result.http_probe.is_empty());
    assert!(result.http_snapshots.is_empty());
    assert!(result.rtsp_found.is_empty());
    assert!(result.likely_vendors.is_empty());
}
