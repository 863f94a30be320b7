//! Image media types, file extension mapping and data URI helpers

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// MIME types accepted by upload intake
pub const SUPPORTED_UPLOAD_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Whether a declared MIME type is on the upload allow-list
pub fn is_supported_upload(mime_type: &str) -> bool {
    let normalized = mime_type.trim().to_ascii_lowercase();
    SUPPORTED_UPLOAD_TYPES.contains(&normalized.as_str())
}

/// Guess the declared type of a local file from its extension.
///
/// Unknown extensions map to `application/octet-stream`, which intake drops.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// File extension to use when exporting an image of the given type
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "bin",
    }
}

/// Build a `data:` URI for an image payload
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Not a data URI"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("Data URI has no payload separator"))?;

    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("Only base64 data URIs are supported"))?;

    let bytes = STANDARD.decode(payload.as_bytes())?;
    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supported_uploads() {
        for mime in SUPPORTED_UPLOAD_TYPES {
            assert!(is_supported_upload(mime));
        }
        assert!(is_supported_upload("IMAGE/JPEG"));
        assert!(!is_supported_upload("image/gif"));
        assert!(!is_supported_upload("application/pdf"));
        assert!(!is_supported_upload(""));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(&PathBuf::from("boat.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(&PathBuf::from("dir/boat.heic")), "image/heic");
        assert_eq!(mime_for_path(&PathBuf::from("notes.txt")), "application/octet-stream");
        assert_eq!(mime_for_path(&PathBuf::from("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_data_uri_decode() {
        let uri = encode_data_uri("image/png", b"\x89PNG");
        assert!(uri.starts_with("data:image/png;base64,"));

        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"\x89PNG");
    }

    #[test]
    fn test_data_uri_rejects_garbage() {
        assert!(decode_data_uri("https://example.com/boat.png").is_err());
        assert!(decode_data_uri("data:image/png,plain").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
    }
}
