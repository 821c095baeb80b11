use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Outcome of one unauthenticated HTTP(S) request to `/` on a single port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpProbe {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub server: Option<String>,
}

/// Result of the structured-protocol (ONVIF) exchange against one device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct OnvifProbe {
    pub onvif_ok: bool,
    pub snapshot_uri: Option<String>,
    pub stream_uri: Option<String>,
    pub error: Option<String>,
}

/// An RTSP URL template that yielded a decodable first frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RtspHit {
    pub url: String,
    pub thumbnail: String,
}

/// Everything learned about one target IP during a fingerprint probe.
///
/// The persisted report holds at most one `ProbeResult` per IP: a later probe
/// replaces the earlier entry rather than appending a second one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub ip: String,
    /// RFC 3339 completion time of the probe run; empty until it finishes.
    #[serde(default)]
    pub probed_at: String,
    pub open_ports: Vec<u16>,
    /// Keyed by `"scheme:port"`, e.g. `"http:80"` or `"https:8443"`.
    pub http_probe: BTreeMap<String, HttpProbe>,
    pub likely_vendors: BTreeSet<String>,
    pub http_snapshots: Vec<String>,
    pub https_snapshots: Vec<String>,
    pub onvif: Option<OnvifProbe>,
    pub rtsp_found: Vec<RtspHit>,
    pub notes: Vec<String>,
}

impl ProbeResult {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            probed_at: String::new(),
            open_ports: Vec::new(),
            http_probe: BTreeMap::new(),
            likely_vendors: BTreeSet::new(),
            http_snapshots: Vec::new(),
            https_snapshots: Vec::new(),
            onvif: None,
            rtsp_found: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// One responder from a WS-Discovery sweep, reduced to best-effort fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCamera {
    pub ip: String,
    pub model: Option<String>,
    pub rtsp_url: Option<String>,
    pub snapshot_path: Option<String>,
}

/// Optional credentials supplied by the caller for authenticated retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Lifecycle of an asynchronous probe job. Terminal states are never left.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

/// One in-flight or completed probe invocation, retained in memory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub ip: String,
    pub status: JobStatus,
    pub progress: u8,
    pub lines: Vec<String>,
    pub result: Option<ProbeResult>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            status: JobStatus::Running,
            progress: 0,
            lines: Vec::new(),
            result: None,
            error: None,
        }
    }
}
