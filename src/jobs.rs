use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{error, info};
use uuid::Uuid;

use crate::probe::{ProgressFn, Prober};
use crate::report::ReportStore;
use crate::types::{Credentials, Job, JobStatus, ProbeResult};

/// Maximum progress lines retained per job; oldest are evicted first.
const MAX_LINES: usize = 10;

/// Process-wide table of probe jobs.
///
/// Cheap to clone; all clones share the same map. Jobs are retained for the
/// life of the process: there is no eviction, matching the appliance's
/// few-probes-per-boot usage. Updates to a job serialize through the table
/// lock; the lock is held only for field updates, never across a probe, so a
/// poll of one job is never blocked by another job's work.
#[derive(Clone, Default)]
pub struct Jobs {
    inner: Arc<RwLock<HashMap<String, Job>>>,
}

impl Jobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a job in `running` state and schedule the probe on a
    /// background task. Returns the fresh job id immediately.
    pub fn start(
        &self,
        prober: Arc<Prober>,
        store: Arc<ReportStore>,
        ip: String,
        creds: Option<Credentials>,
    ) -> String {
        let id = self.create(&ip);
        self.report_progress(&id, 0, &format!("Starting identify for {ip}"));
        info!(job_id = %id, ip, "probe job started");

        let jobs = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            let cb_jobs = jobs.clone();
            let cb_id = job_id.clone();
            let cb = move |percent: u8, msg: &str| cb_jobs.report_progress(&cb_id, percent, msg);
            let progress: &ProgressFn = &cb;

            match prober
                .identify(&ip, creds.as_ref(), &store, Some(progress))
                .await
            {
                Ok(result) => jobs.finish(&job_id, result),
                Err(e) => {
                    error!(job_id = %job_id, ip, error = %format!("{e:#}"), "probe job failed");
                    jobs.fail(&job_id, &format!("{e:#}"));
                }
            }
        });
        id
    }

    /// Allocate a fresh `running` job record for `ip` without scheduling
    /// any work. `start` builds on this; it is also the seam tests use.
    pub fn create(&self, ip: &str) -> String {
        let id = new_job_id();
        let mut map = self.inner.write().expect("job table lock");
        map.insert(id.clone(), Job::new(&id, ip));
        id
    }

    /// Snapshot of a job, or `None` for an unknown id. Never blocks on the
    /// job's probe and never exposes a half-applied update.
    pub fn poll(&self, id: &str) -> Option<Job> {
        self.inner.read().expect("job table lock").get(id).cloned()
    }

    /// Record progress. Percent clamps to 0-100 and never moves backwards;
    /// updates against a terminal job are ignored.
    pub fn report_progress(&self, id: &str, percent: u8, msg: &str) {
        let mut map = self.inner.write().expect("job table lock");
        let Some(job) = map.get_mut(id) else {
            return;
        };
        if job.status != JobStatus::Running {
            return;
        }
        job.progress = job.progress.max(percent.min(100));
        if !msg.is_empty() {
            job.lines.push(msg.to_string());
            if job.lines.len() > MAX_LINES {
                let excess = job.lines.len() - MAX_LINES;
                job.lines.drain(..excess);
            }
        }
    }

    /// Terminal success transition. No-op for unknown or already-terminal jobs.
    pub fn finish(&self, id: &str, result: ProbeResult) {
        let mut map = self.inner.write().expect("job table lock");
        let Some(job) = map.get_mut(id) else {
            return;
        };
        if job.status != JobStatus::Running {
            return;
        }
        job.status = JobStatus::Done;
        job.progress = 100;
        job.result = Some(result);
    }

    /// Terminal failure transition. No-op for unknown or already-terminal jobs.
    pub fn fail(&self, id: &str, message: &str) {
        let mut map = self.inner.write().expect("job table lock");
        let Some(job) = map.get_mut(id) else {
            return;
        };
        if job.status != JobStatus::Running {
            return;
        }
        job.status = JobStatus::Error;
        job.error = Some(message.to_string());
    }
}

/// Opaque 12-hex job token; ids are never reused.
fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}
