use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Parse a ports file content into a deduplicated list of TCP ports (1..=65535).
///
/// Supported formats per line:
/// - single port number: `554`
/// - inclusive range: `8000-8010`
/// - comments: everything after `#` is ignored
/// - whitespace and blank lines are ignored
pub fn parse_ports_str(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }

        // Range `start-end`
        if let Some((a, b)) = line.split_once('-') {
            let start = parse_port_str(a.trim())
                .with_context(|| format!("line {line_no}: invalid start in range: {a}"))?;
            let end = parse_port_str(b.trim())
                .with_context(|| format!("line {line_no}: invalid end in range: {b}"))?;
            if start > end {
                bail!("line {line_no}: invalid range {start}-{end} (start > end)");
            }
            for p in start..=end {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            continue;
        }

        let p = parse_port_str(line)
            .with_context(|| format!("line {line_no}: invalid port value: {line}"))?;
        if seen.insert(p) {
            out.push(p);
        }
    }

    Ok(out)
}

/// Parse a candidate-list file (snapshot paths or RTSP templates): one entry
/// per line, `#` comments, order preserved, duplicates removed.
pub fn parse_list_str(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for raw_line in s.lines() {
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }
        if seen.insert(line.to_string()) {
            out.push(line.to_string());
        }
    }
    out
}

/// Load a ports list from a file, or return the embedded default if the file
/// is missing, unreadable, or empty.
pub fn load_ports_or_default(path: impl AsRef<Path>) -> Vec<u16> {
    match fs::read_to_string(path.as_ref()).map(|c| parse_ports_str(&c)) {
        Ok(Ok(v)) if !v.is_empty() => v,
        _ => default_probe_ports(),
    }
}

/// Load a candidate list from a file, or return `default` when missing/empty.
pub fn load_list_or_default(path: impl AsRef<Path>, default: fn() -> Vec<String>) -> Vec<String> {
    match fs::read_to_string(path.as_ref()) {
        Ok(c) => {
            let v = parse_list_str(&c);
            if v.is_empty() {
                default()
            } else {
                v
            }
        }
        Err(_) => default(),
    }
}

/// Ports a camera-ish device plausibly listens on. Tried with a short TCP
/// connect during the port sweep stage.
pub fn default_probe_ports() -> Vec<u16> {
    const DEFAULT: &[u16] = &[80, 443, 554, 8000, 8080, 8443, 7001, 8554, 5000, 5001];
    DEFAULT.to_vec()
}

/// Ports probed with an unauthenticated plain-HTTP request to `/`.
pub fn default_http_header_ports() -> Vec<u16> {
    vec![80, 8080, 8000]
}

/// Ports probed with an unauthenticated HTTPS request to `/`.
pub fn default_https_header_ports() -> Vec<u16> {
    vec![443, 8443, 5001]
}

/// Well-known snapshot endpoints across common camera vendors. Order matters:
/// cheap generic paths first, vendor CGI conventions after.
pub fn default_snapshot_paths() -> Vec<String> {
    const DEFAULT: &[&str] = &[
        "/snapshot.jpg",
        "/image.jpg",
        "/image.png",
        "/jpg/image.jpg",
        "/cgi-bin/snapshot.cgi",
        "/cgi-bin/CGIStream.cgi?cmd=snap&usr=&pwd=",
        "/cgi-bin/CGIProxy.fcgi?cmd=snapPicture2&usr=&pwd=",
        "/videostream.cgi?user=admin&pwd=",
        "/image.jpg?size=2",
        "/axis-cgi/jpg/image.cgi",
        "/axis-cgi/jpg/image.jpg",
        "/ISAPI/Streaming/channels/101/picture",
        "/ISAPI/Streaming/channels/102/picture",
        "/cgi-bin/snapshot2.cgi",
        "/cgi-bin/api.cgi?cmd=Snap&channel=0",
        "/cgi-bin/snapshot.cgi?channel=1",
        "/entry.cgi?view=surveillance&cmd=snapshot&cameraId=1",
        "/cgi-bin/viewer/snapshot.jpg",
        "/snapshot.jpeg",
        "/onvif/snapshot",
        "/onvif/media_service/snapshot",
        "/SnapshotJPEG?Resolution=640x480",
        "/Streaming/Channels/101/picture",
        "/webapi/entry.cgi?api=SYNO.SurveillanceStation.Camera&method=GetSnapshot&version=1&cameraId=1",
    ];
    DEFAULT.iter().map(|s| s.to_string()).collect()
}

/// RTSP URL templates parameterized by `{ip}`, tried in order with a one-frame
/// ffmpeg decode.
pub fn default_rtsp_templates() -> Vec<String> {
    const DEFAULT: &[&str] = &[
        "rtsp://{ip}/live.sdp",
        "rtsp://{ip}:8554/live.sdp",
        "rtsp://{ip}:554/Streaming/Channels/101",
        "rtsp://{ip}:554/Streaming/Channels/102",
        "rtsp://{ip}:8554/Streaming/Channels/101",
        "rtsp://{ip}:8554/Streaming/Channels/102",
        "rtsp://{ip}/Streaming/Channels/101",
        "rtsp://{ip}/h264/ch1/main/av_stream",
        "rtsp://{ip}:8554/h264/ch1/main/av_stream",
        "rtsp://{ip}/ISAPI/Streaming/Channels/101",
        "rtsp://{ip}:8554/ISAPI/Streaming/Channels/101",
        "rtsp://{ip}/cam/realmonitor?channel=1&subtype=0",
        "rtsp://{ip}:554/cam/realmonitor?channel=1&subtype=0",
        "rtsp://{ip}:8554/cam/realmonitor?channel=1&subtype=0",
        "rtsp://{ip}/axis-media/media.amp",
        "rtsp://{ip}:8554/axis-media/media.amp",
        "rtsp://{ip}/h264Preview_01_main",
        "rtsp://{ip}:8554/h264Preview_01_main",
        "rtsp://{ip}/videoMain",
        "rtsp://{ip}/videoSub",
        "rtsp://{ip}:554/stream1",
        "rtsp://{ip}:554/stream2",
        "rtsp://{ip}:8554/stream1",
        "rtsp://{ip}:8554/stream2",
        "rtsp://{ip}/unicast",
        "rtsp://{ip}/rtsp/1",
        "rtsp://{ip}:8554/unicast",
        "rtsp://{ip}:8554/rtsp/1",
        "rtsp://{ip}/LiveMedia/stream1",
        "rtsp://{ip}:8554/LiveMedia/stream1",
        "rtsp://{ip}/mediaportal/stream1",
        "rtsp://{ip}:8554/mediaportal/stream1",
    ];
    DEFAULT.iter().map(|s| s.to_string()).collect()
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_ports() {
        let input = "80\n554\n   8554  \n";
        let ports = parse_ports_str(input).unwrap();
        assert_eq!(ports, vec![80, 554, 8554]);
    }

    #[test]
    fn parse_ranges_and_dedup() {
        let input = "8000-8002\n80\n8001\n";
        let ports = parse_ports_str(input).unwrap();
        assert_eq!(ports, vec![8000, 8001, 8002, 80]);
    }

    #[test]
    fn parse_list_keeps_order_and_drops_duplicates() {
        let input = r#"
            # vendor snapshot endpoints
            /snapshot.jpg
            /image.jpg   # generic
            /snapshot.jpg
        "#;
        let list = parse_list_str(input);
        assert_eq!(list, vec!["/snapshot.jpg", "/image.jpg"]);
    }

    #[test]
    fn invalid_port_rejected() {
        assert!(parse_ports_str("70000\n").is_err());
        assert!(parse_ports_str("0\n").is_err());
    }

    #[test]
    fn defaults_cover_core_protocols() {
        let ports = default_probe_ports();
        assert!(ports.contains(&80) && ports.contains(&443) && ports.contains(&554));
        assert!(default_snapshot_paths().iter().any(|p| p == "/snapshot.jpg"));
        assert!(default_rtsp_templates().iter().all(|t| t.contains("{ip}")));
    }
}
