//! Live round-trip check of the configured image host.
//!
//! Uploads a fixed 1×1 PNG, reports the outcome together with the masked configuration,
//! and removes the test object again.

use super::{ImageGateway, ImageUpload, MaskedCredentials, ProviderKind};
use serde::Serialize;
use tracing::{info, warn};

/// Folder diagnostic uploads are written to.
pub const DIAGNOSTICS_FOLDER: &str = "diagnostics";

/// A transparent 1×1 PNG.
pub const PROBE_PNG: [u8; 70] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64,
    0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Outcome of the test upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    /// Whether the upload succeeded
    pub ok: bool,
    /// URL of the uploaded probe
    pub url: Option<String>,
    /// Provider id of the uploaded probe
    pub file_id: Option<String>,
    /// Failure code when `ok` is false
    pub code: Option<String>,
    /// Failure message when `ok` is false
    pub message: Option<String>,
    /// Whether the probe was removed again
    pub cleaned_up: bool,
}

/// Diagnostics payload returned by `GET /diagnostics/<provider>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    /// Provider wired into the gateway
    pub provider: ProviderKind,
    /// Whether all credentials are present
    pub configured: bool,
    /// Redacted credentials
    pub config: MaskedCredentials,
    /// Round-trip outcome; absent when unconfigured
    pub test: Option<ProbeResult>,
}

pub(super) async fn run(gateway: &ImageGateway) -> DiagnosticsReport {
    let configured = gateway.is_configured();
    let mut report = DiagnosticsReport {
        provider: gateway.kind(),
        configured,
        config: gateway.masked_config(),
        test: None,
    };
    if !configured {
        return report;
    }

    let upload = ImageUpload::new("diagnostics_probe.png".to_string(), PROBE_PNG.to_vec());
    let probe = match gateway.upload(upload, DIAGNOSTICS_FOLDER).await {
        Ok(image) => {
            let cleaned_up = match image.file_id.as_deref() {
                Some(file_id) => gateway.delete(file_id).await.is_ok(),
                None => false,
            };
            info!(provider = %gateway.kind(), cleaned_up, "Diagnostics upload succeeded");
            ProbeResult {
                ok: true,
                url: Some(image.url),
                file_id: image.file_id,
                code: None,
                message: None,
                cleaned_up,
            }
        }
        Err(e) => {
            warn!(provider = %gateway.kind(), code = e.code(), "Diagnostics upload failed: {e}");
            ProbeResult {
                ok: false,
                url: None,
                file_id: None,
                code: Some(e.code().to_string()),
                message: Some(e.to_string()),
                cleaned_up: false,
            }
        }
    };
    report.test = Some(probe);
    report
}
