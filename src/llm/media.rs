use anyhow::{anyhow, Result};
use tracing::warn;

use crate::utils::http::get_http_client;

const MEDIA_DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;
const FALLBACK_IMAGE_MIME: &str = "image/png";

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

pub fn is_supported_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// Raw image bytes with the MIME type they will be sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    /// Sniffs the MIME type, falling back to `declared` and then PNG.
    /// Returns `None` for data that is not an image Gemini accepts.
    pub fn from_bytes(bytes: Vec<u8>, declared: Option<&str>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let candidates = detect_mime_type(&bytes)
            .into_iter()
            .chain(declared.map(str::to_string));
        for candidate in candidates {
            let normalized = normalize_image_mime(&candidate);
            if is_supported_image_mime(&normalized) {
                return Some(ImagePayload {
                    bytes,
                    mime_type: normalized,
                });
            }
        }
        if declared.is_none() && detect_mime_type(&bytes).is_none() {
            return Some(ImagePayload {
                bytes,
                mime_type: FALLBACK_IMAGE_MIME.to_string(),
            });
        }
        None
    }
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

pub async fn download_media(url: &str) -> Result<Vec<u8>> {
    let client = get_http_client();
    let response = client.get(url).send().await.map_err(|err| {
        warn!(
            "Failed to fetch media: {err} (timeout={}, connect={}, status={:?})",
            err.is_timeout(),
            err.is_connect(),
            err.status()
        );
        anyhow!("Failed to download the image")
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Media download failed with status {}: {}",
            status,
            truncate_for_log(&body, MEDIA_DOWNLOAD_ERROR_BODY_LIMIT)
        );
        return Err(anyhow!("Image download failed with status {status}"));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| anyhow!("Failed to read image bytes: {err}"))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d, 0x49, 0x48, 0x44, 0x52,
    ];

    #[test]
    fn sniffed_type_wins_over_declared() {
        let payload =
            ImagePayload::from_bytes(PNG_SIGNATURE.to_vec(), Some("image/jpeg")).expect("png");
        assert_eq!(payload.mime_type, "image/png");
    }

    #[test]
    fn declared_type_is_normalized() {
        let payload =
            ImagePayload::from_bytes(vec![1, 2, 3], Some("IMAGE/JPG")).expect("declared jpeg");
        assert_eq!(payload.mime_type, "image/jpeg");
    }

    #[test]
    fn rejects_empty_and_unsupported_data() {
        assert_eq!(ImagePayload::from_bytes(Vec::new(), None), None);
        assert_eq!(
            ImagePayload::from_bytes(vec![1, 2, 3], Some("application/pdf")),
            None
        );
        let pdf = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3".to_vec();
        assert_eq!(ImagePayload::from_bytes(pdf, None), None);
    }

    #[test]
    fn unknown_bytes_without_declared_type_default_to_png() {
        let payload = ImagePayload::from_bytes(vec![1, 2, 3], None).expect("fallback");
        assert_eq!(payload.mime_type, FALLBACK_IMAGE_MIME);
    }
}
