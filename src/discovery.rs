use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::onvif::{extract_tag, OnvifClient};
use crate::probe::{ffmpeg_one_frame, Prober};
use crate::types::DiscoveredCamera;

const WS_DISCOVERY_ADDR: &str = "239.255.255.250:3702";
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(4);

/// Single best-effort WS-Discovery sweep of the local segment.
///
/// Multicasts one SOAP Probe for network video transmitters, collects
/// ProbeMatches until `timeout` elapses, then resolves each responder's
/// model, stream URI and snapshot via unauthenticated ONVIF. Every
/// per-candidate failure degrades that candidate's fields to `None`; a
/// responder that cannot be reduced to an IP is dropped. No retries.
pub async fn discover(prober: &Prober, timeout: Duration) -> Result<Vec<DiscoveredCamera>> {
    let ips = sweep(timeout).await?;
    info!(responders = ips.len(), "ws-discovery sweep complete");

    let mut cams = Vec::new();
    for ip in ips {
        cams.push(resolve_candidate(prober, &ip).await);
    }
    Ok(cams)
}

/// Collect responder IPs from one multicast Probe.
async fn sweep(timeout: Duration) -> Result<Vec<String>> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind ws-discovery socket")?;
    socket
        .send_to(probe_message().as_bytes(), WS_DISCOVERY_ADDR)
        .await
        .context("failed to send ws-discovery probe")?;

    let deadline = Instant::now() + timeout;
    let mut seen = HashSet::new();
    let mut ips = Vec::new();
    let mut buf = vec![0u8; 65_535];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match time::timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) => {
                let xml = String::from_utf8_lossy(&buf[..n]);
                match xaddrs_ip(&xml) {
                    Some(ip) => {
                        if seen.insert(ip.clone()) {
                            ips.push(ip);
                        }
                    }
                    None => debug!(%from, "responder without usable XAddrs dropped"),
                }
            }
            Ok(Err(e)) => {
                debug!(error = %e, "ws-discovery recv failed");
                break;
            }
            Err(_) => break, // window elapsed
        }
    }
    Ok(ips)
}

async fn resolve_candidate(prober: &Prober, ip: &str) -> DiscoveredCamera {
    let client = OnvifClient::new(prober.http_client().clone(), ip, None);

    let model = match client.device_information().await {
        Ok(info) => info.model,
        Err(e) => {
            debug!(ip, error = %e, "GetDeviceInformation failed");
            None
        }
    };

    let mut rtsp_url = None;
    let mut snapshot_path = None;
    match client.first_profile_media().await {
        Ok(uris) => {
            rtsp_url = uris.stream_uri;
            if let Some(snap_uri) = uris.snapshot_uri {
                snapshot_path = download_snapshot(prober, ip, &snap_uri).await;
            }
            if snapshot_path.is_none() {
                if let Some(url) = &rtsp_url {
                    let file = prober
                        .config()
                        .snaps_dir
                        .join(format!("{}.jpg", safe_filename(ip)));
                    if ffmpeg_one_frame(prober.config().ffmpeg_timeout, url, &file).await {
                        snapshot_path = Some(file.display().to_string());
                    }
                }
            }
        }
        Err(e) => debug!(ip, error = %e, "ONVIF detail fetch failed"),
    }

    DiscoveredCamera {
        ip: ip.to_string(),
        model,
        rtsp_url,
        snapshot_path,
    }
}

async fn download_snapshot(prober: &Prober, ip: &str, url: &str) -> Option<String> {
    let file = prober
        .config()
        .snaps_dir
        .join(format!("{}.jpg", safe_filename(ip)));
    match prober
        .http_client()
        .get(url)
        .timeout(prober.config().snapshot_timeout)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            let bytes = resp.bytes().await.ok()?;
            std::fs::write(&file, &bytes).ok()?;
            Some(file.display().to_string())
        }
        Ok(resp) => {
            debug!(ip, url, status = %resp.status(), "snapshot download rejected");
            None
        }
        Err(e) => {
            debug!(ip, url, error = %e, "snapshot download failed");
            None
        }
    }
}

fn probe_message() -> String {
    let message_id = Uuid::new_v4();
    format!(
        concat!(
            r#"<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope""#,
            r#" xmlns:w="http://schemas.xmlsoap.org/ws/2004/08/addressing""#,
            r#" xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery""#,
            r#" xmlns:dn="http://www.onvif.org/ver10/network/wsdl">"#,
            r#"<e:Header>"#,
            r#"<w:MessageID>urn:uuid:{id}</w:MessageID>"#,
            r#"<w:To e:mustUnderstand="true">urn:schemas-xmlsoap-org:ws:2005:04:discovery</w:To>"#,
            r#"<w:Action e:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</w:Action>"#,
            r#"</e:Header>"#,
            r#"<e:Body><d:Probe><d:Types>dn:NetworkVideoTransmitter</d:Types></d:Probe></e:Body>"#,
            r#"</e:Envelope>"#
        ),
        id = message_id
    )
}

/// First transport address from a ProbeMatch, reduced to its host IP.
fn xaddrs_ip(xml: &str) -> Option<String> {
    let xaddrs = extract_tag(xml, "XAddrs")?;
    for xaddr in xaddrs.split_whitespace() {
        if let Some((_, rest)) = xaddr.split_once("://") {
            let host = rest.split('/').next().unwrap_or(rest);
            let ip = host.split(':').next().unwrap_or(host);
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }
    None
}

fn safe_filename(ip: &str) -> String {
    ip.replace([':', '.'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_MATCH: &str = r#"
        <SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
            xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery">
          <SOAP-ENV:Body>
            <d:ProbeMatches>
              <d:ProbeMatch>
                <d:XAddrs>http://192.168.1.64:8080/onvif/device_service http://[fe80::1]/onvif/device_service</d:XAddrs>
              </d:ProbeMatch>
            </d:ProbeMatches>
          </SOAP-ENV:Body>
        </SOAP-ENV:Envelope>"#;

    #[test]
    fn xaddrs_reduce_to_host_ip() {
        assert_eq!(xaddrs_ip(PROBE_MATCH).as_deref(), Some("192.168.1.64"));
    }

    #[test]
    fn reply_without_xaddrs_is_dropped() {
        assert_eq!(xaddrs_ip("<Envelope><Body/></Envelope>"), None);
    }

    #[test]
    fn safe_filename_flattens_separators() {
        assert_eq!(safe_filename("192.168.1.64"), "192_168_1_64");
    }

    #[test]
    fn probe_message_is_addressed_to_discovery() {
        let msg = probe_message();
        assert!(msg.contains("NetworkVideoTransmitter"));
        assert!(msg.contains("urn:uuid:"));
    }
}
