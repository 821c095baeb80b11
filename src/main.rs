use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cam_probe_rs::jobs::Jobs;
use cam_probe_rs::probe::{ProbeConfig, Prober};
use cam_probe_rs::report::ReportStore;
use cam_probe_rs::types::{Credentials, ProbeResult};
use cam_probe_rs::{candidates, discovery, netdetect, server};

/// cam-probe-rs — Best-effort IP camera discovery and fingerprinting engine
/// with a tiny embedded admin API.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cam-probe-rs",
    version,
    about = "Best-effort IP camera discovery and fingerprinting engine with a tiny embedded admin API.",
    long_about = None
)]
struct Cli {
    /// Single IP to fingerprint.
    #[arg(long, conflicts_with = "ips_file")]
    ip: Option<String>,

    /// Path to a file with one IP per line.
    #[arg(long = "ips-file")]
    ips_file: Option<PathBuf>,

    /// Optional username for credentialed retries.
    #[arg(long)]
    user: Option<String>,

    /// Optional password for credentialed retries.
    #[arg(long)]
    password: Option<String>,

    /// Run a WS-Discovery sweep and print the candidates.
    #[arg(long, default_value_t = false)]
    discover: bool,

    /// Discovery window in seconds.
    #[arg(long = "discover-timeout-secs", default_value_t = 4)]
    discover_timeout_secs: u64,

    /// Runtime directory holding snapshots and the identify report.
    #[arg(long = "runtime-dir", default_value = "runtime")]
    runtime_dir: PathBuf,

    /// Probe ports override file (one port or range per line).
    #[arg(long)]
    ports: Option<PathBuf>,

    /// Snapshot-path override file (one path per line).
    #[arg(long = "snapshot-paths")]
    snapshot_paths: Option<PathBuf>,

    /// RTSP-template override file (one template per line).
    #[arg(long = "rtsp-templates")]
    rtsp_templates: Option<PathBuf>,

    /// Skip the ONVIF stage entirely.
    #[arg(long = "no-onvif", default_value_t = false)]
    no_onvif: bool,

    /// Write probe results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Start the embedded admin API server.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Bind address for the admin API.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if !cli.discover && !cli.serve_ui && cli.ip.is_none() && cli.ips_file.is_none() {
        bail!("nothing to do: pass --ip, --ips-file, --discover or --serve-ui");
    }

    let mut cfg = ProbeConfig::new(cli.runtime_dir.join("snaps"));
    if let Some(path) = &cli.ports {
        cfg.probe_ports = candidates::load_ports_or_default(path);
    }
    if let Some(path) = &cli.snapshot_paths {
        cfg.snapshot_paths =
            candidates::load_list_or_default(path, candidates::default_snapshot_paths);
    }
    if let Some(path) = &cli.rtsp_templates {
        cfg.rtsp_templates =
            candidates::load_list_or_default(path, candidates::default_rtsp_templates);
    }
    cfg.enable_onvif = !cli.no_onvif;

    let snaps_dir = cfg.snaps_dir.clone();
    let prober = Arc::new(Prober::new(cfg)?);
    let store = Arc::new(ReportStore::new(cli.runtime_dir.join("identify_report.json")));

    if cli.discover {
        let timeout = Duration::from_secs(cli.discover_timeout_secs);
        let cams = discovery::discover(&prober, timeout).await?;
        println!("Discovered {} camera candidate(s):", cams.len());
        for c in &cams {
            println!(
                "  {}  model={}  rtsp={}  snapshot={}",
                c.ip,
                c.model.as_deref().unwrap_or("Unknown"),
                c.rtsp_url.as_deref().unwrap_or("<none>"),
                c.snapshot_path.as_deref().unwrap_or("<none>")
            );
        }
    }

    // Batch fingerprinting from the CLI runs probes one at a time, printing
    // progress lines as they arrive.
    let targets = collect_targets(&cli)?;
    if !targets.is_empty() {
        let creds = match (cli.user.as_deref(), cli.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Credentials {
                user: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        };

        let mut results: Vec<ProbeResult> = Vec::new();
        for ip in &targets {
            println!("Scanning: {ip}");
            let print_progress = |percent: u8, msg: &str| println!("  [{percent:>3}%] {msg}");
            match prober
                .identify(ip, creds.as_ref(), &store, Some(&print_progress))
                .await
            {
                Ok(result) => results.push(result),
                Err(e) => eprintln!("probe of {ip} failed: {e:#}"),
            }
        }

        print_results_summary(&results);
        println!("Saved thumbnails to: {}", snaps_dir.display());
        println!("Report location: {}", store.path().display());
        if let Some(path) = cli.output.as_deref() {
            if let Err(e) = write_results_json(path, &results) {
                eprintln!("Failed to write JSON to {}: {}", path.display(), e);
            } else {
                println!("Wrote JSON results to {}", path.display());
            }
        }
    }

    if cli.serve_ui {
        let state = server::AppState {
            jobs: Jobs::new(),
            prober: prober.clone(),
            store: store.clone(),
        };
        let bind = cli.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = server::spawn_server(&bind, state).await {
                eprintln!("admin api server error: {e}");
            }
        });
        match netdetect::first_ipv4() {
            Ok(Some(ip)) => println!(
                "Admin API starting at http://{} (reachable on http://{}:{})",
                cli.bind,
                ip,
                cli.bind.rsplit(':').next().unwrap_or("8080")
            ),
            _ => println!("Admin API starting at http://{}", cli.bind),
        }
        println!("Press Ctrl+C to stop the server...");
        let _ = tokio::signal::ctrl_c().await;
    }

    Ok(())
}

fn collect_targets(cli: &Cli) -> Result<Vec<String>> {
    if let Some(ip) = &cli.ip {
        return Ok(vec![ip.clone()]);
    }
    let Some(path) = &cli.ips_file else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ips file: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn print_results_summary(results: &[ProbeResult]) {
    println!("\nProbed {} target(s):", results.len());
    for r in results {
        let vendors: Vec<&str> = r.likely_vendors.iter().map(String::as_str).collect();
        println!(
            "  {}  open_ports={:?}  vendors=[{}]  snapshots={}  rtsp_found={}",
            r.ip,
            r.open_ports,
            vendors.join(", "),
            r.http_snapshots.len() + r.https_snapshots.len(),
            r.rtsp_found.len()
        );
    }
}

fn write_results_json(path: &std::path::Path, results: &[ProbeResult]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
