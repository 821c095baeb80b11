use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::types::Credentials;

const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
const SOAP_TIMEOUT: Duration = Duration::from_secs(4);

/// Manufacturer/model pair from `GetDeviceInformation`.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Media URIs resolved from a device's first media profile.
#[derive(Debug, Clone, Default)]
pub struct MediaUris {
    pub stream_uri: Option<String>,
    pub snapshot_uri: Option<String>,
}

/// Minimal ONVIF SOAP client: just the device-management and media exchanges
/// the prober needs. Credentials, when present, ride as HTTP basic auth.
pub struct OnvifClient {
    http: Client,
    device_endpoint: String,
    fallback_media_endpoint: String,
    creds: Option<Credentials>,
}

impl OnvifClient {
    pub fn new(http: Client, ip: &str, creds: Option<Credentials>) -> Self {
        Self {
            http,
            device_endpoint: format!("http://{ip}/onvif/device_service"),
            fallback_media_endpoint: format!("http://{ip}/onvif/media_service"),
            creds,
        }
    }

    /// Fetch manufacturer/model metadata.
    pub async fn device_information(&self) -> Result<DeviceInfo> {
        let body = format!(r#"<GetDeviceInformation xmlns="{DEVICE_NS}"/>"#);
        let xml = self.call(&self.device_endpoint, &body).await?;
        Ok(DeviceInfo {
            manufacturer: extract_tag(&xml, "Manufacturer"),
            model: extract_tag(&xml, "Model"),
        })
    }

    /// Resolve stream and snapshot URIs from the first media profile.
    ///
    /// Fails if the device exposes no media profiles at all; a missing stream
    /// or snapshot URI alone degrades to `None` in the returned pair.
    pub async fn first_profile_media(&self) -> Result<MediaUris> {
        let media_ep = self.media_endpoint().await;
        let tokens = self.profile_tokens(&media_ep).await?;
        let Some(token) = tokens.first() else {
            bail!("device reports no media profiles");
        };

        let mut uris = MediaUris::default();
        match self.stream_uri(&media_ep, token).await {
            Ok(uri) => uris.stream_uri = Some(uri),
            Err(e) => debug!(error = %e, "GetStreamUri failed"),
        }
        match self.snapshot_uri(&media_ep, token).await {
            Ok(uri) => uris.snapshot_uri = Some(uri),
            Err(e) => debug!(error = %e, "GetSnapshotUri failed"),
        }
        Ok(uris)
    }

    /// Ask the device for its media service address; fall back to the
    /// conventional `/onvif/media_service` path when GetCapabilities fails.
    async fn media_endpoint(&self) -> String {
        let body = format!(
            r#"<GetCapabilities xmlns="{DEVICE_NS}"><Category>Media</Category></GetCapabilities>"#
        );
        match self.call(&self.device_endpoint, &body).await {
            Ok(xml) => {
                extract_tag(&xml, "XAddr").unwrap_or_else(|| self.fallback_media_endpoint.clone())
            }
            Err(e) => {
                debug!(error = %e, "GetCapabilities failed, using conventional media path");
                self.fallback_media_endpoint.clone()
            }
        }
    }

    async fn profile_tokens(&self, media_ep: &str) -> Result<Vec<String>> {
        let body = format!(r#"<GetProfiles xmlns="{MEDIA_NS}"/>"#);
        let xml = self.call(media_ep, &body).await?;
        Ok(extract_attr_all(&xml, "Profiles", "token"))
    }

    async fn stream_uri(&self, media_ep: &str, token: &str) -> Result<String> {
        let body = format!(
            concat!(
                r#"<GetStreamUri xmlns="{ns}">"#,
                r#"<StreamSetup>"#,
                r#"<Stream xmlns="http://www.onvif.org/ver10/schema">RTP-Unicast</Stream>"#,
                r#"<Transport xmlns="http://www.onvif.org/ver10/schema"><Protocol>RTSP</Protocol></Transport>"#,
                r#"</StreamSetup>"#,
                r#"<ProfileToken>{token}</ProfileToken>"#,
                r#"</GetStreamUri>"#
            ),
            ns = MEDIA_NS,
            token = token
        );
        let xml = self.call(media_ep, &body).await?;
        extract_tag(&xml, "Uri").context("no Uri in GetStreamUri response")
    }

    async fn snapshot_uri(&self, media_ep: &str, token: &str) -> Result<String> {
        let body = format!(
            r#"<GetSnapshotUri xmlns="{MEDIA_NS}"><ProfileToken>{token}</ProfileToken></GetSnapshotUri>"#
        );
        let xml = self.call(media_ep, &body).await?;
        extract_tag(&xml, "Uri").context("no Uri in GetSnapshotUri response")
    }

    async fn call(&self, endpoint: &str, body: &str) -> Result<String> {
        let envelope = format!(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>{body}</s:Body></s:Envelope>"#
        );
        let mut req = self
            .http
            .post(endpoint)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .timeout(SOAP_TIMEOUT)
            .body(envelope);
        if let Some(c) = &self.creds {
            req = req.basic_auth(&c.user, Some(&c.password));
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("soap request to {endpoint} failed"))?;
        let status = resp.status();
        let text = resp.text().await.context("soap response body unreadable")?;
        if !status.is_success() {
            bail!("soap call to {endpoint} returned {status}");
        }
        if extract_tag(&text, "Fault").is_some() || text.contains("Fault>") {
            bail!("soap fault from {endpoint}");
        }
        Ok(text)
    }
}

/// Text content of the first element whose local name matches, ignoring any
/// namespace prefix. Good enough for flat ONVIF responses; not a full parser.
pub fn extract_tag(xml: &str, local: &str) -> Option<String> {
    for (name, rest) in element_opens(xml) {
        if name == local {
            let content_start = rest.find('>')? + 1;
            let content = &rest[content_start..];
            let end = content.find('<')?;
            let value = content[..end].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// All values of `attr` across elements whose local name matches.
pub fn extract_attr_all(xml: &str, local: &str, attr: &str) -> Vec<String> {
    let needle = format!("{attr}=\"");
    let mut out = Vec::new();
    for (name, rest) in element_opens(xml) {
        if name != local {
            continue;
        }
        let Some(tag_end) = rest.find('>') else {
            continue;
        };
        let tag = &rest[..tag_end];
        if let Some(pos) = tag.find(&needle) {
            let value = &tag[pos + needle.len()..];
            if let Some(end) = value.find('"') {
                out.push(value[..end].to_string());
            }
        }
    }
    out
}

/// Iterate opening elements as (local name, text starting at the name).
fn element_opens<'a>(xml: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
    xml.match_indices('<').filter_map(move |(i, _)| {
        let rest = &xml[i + 1..];
        if rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('!') {
            return None;
        }
        let name_end = rest.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
        let qualified = &rest[..name_end];
        let local = qualified.rsplit(':').next().unwrap_or(qualified);
        Some((local, rest))
    })
}
