//! Inline image attachments
//!
//! An attachment travels as a data URI (`data:<mime>;base64,<payload>`), the
//! same string a browser file reader produces. The gateway strips the prefix
//! back off before building the provider request.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("failed reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An image encoded as a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineImage {
    data_uri: String,
}

impl InlineImage {
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        Self {
            data_uri: format!("data:{mime};base64,{}", BASE64.encode(bytes)),
        }
    }

    /// Read a local file and encode it. Any file is accepted as-is.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let bytes = fs::read(path).map_err(|source| AttachmentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mime = mime_for_path(path).unwrap_or(FALLBACK_MIME);
        Ok(Self::from_bytes(&bytes, mime))
    }

    /// Wrap a string that is already a data URI (or bare base64)
    pub fn from_data_uri(data_uri: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn base64_payload(&self) -> &str {
        strip_data_uri_prefix(&self.data_uri)
    }

    /// Mime type declared in the URI header, if there is one
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.data_uri.strip_prefix("data:")?;
        let (header, _) = header.split_once(',')?;
        let mime = header.split(';').next().unwrap_or_default();
        (!mime.is_empty()).then_some(mime)
    }

    /// Size of the encoded payload, for display
    pub fn encoded_len(&self) -> usize {
        self.base64_payload().len()
    }
}

/// Recover the raw base64 payload from a data URI.
///
/// Returns the text after the first comma; input without a comma, or with
/// nothing after it, is returned unchanged.
pub fn strip_data_uri_prefix(value: &str) -> &str {
    match value.split_once(',') {
        Some((_, rest)) => {
            let payload = rest.split(',').next().unwrap_or_default();
            if payload.is_empty() {
                value
            } else {
                payload
            }
        }
        None => value,
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // 1x1 transparent PNG
    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    #[test]
    fn test_encode_then_strip_recovers_payload() {
        let bytes = BASE64.decode(PIXEL_PNG).unwrap();
        let image = InlineImage::from_bytes(&bytes, "image/png");

        assert!(image.data_uri().starts_with("data:image/png;base64,"));
        assert_eq!(strip_data_uri_prefix(image.data_uri()), PIXEL_PNG);
        assert_eq!(image.base64_payload(), PIXEL_PNG);
    }

    #[test]
    fn test_strip_without_prefix_is_identity() {
        assert_eq!(strip_data_uri_prefix(PIXEL_PNG), PIXEL_PNG);
    }

    #[test]
    fn test_strip_with_empty_payload_returns_input() {
        assert_eq!(
            strip_data_uri_prefix("data:image/png;base64,"),
            "data:image/png;base64,"
        );
    }

    #[test]
    fn test_mime_type_from_header() {
        let image = InlineImage::from_bytes(b"abc", "image/jpeg");
        assert_eq!(image.mime_type(), Some("image/jpeg"));
        assert_eq!(InlineImage::from_data_uri(PIXEL_PNG).mime_type(), None);
    }

    #[test]
    fn test_from_path_guesses_mime() {
        let mut file = tempfile::Builder::new().suffix(".JPG").tempfile().unwrap();
        file.write_all(b"not really a jpeg").unwrap();

        let image = InlineImage::from_path(file.path()).unwrap();
        assert_eq!(image.mime_type(), Some("image/jpeg"));
        assert_eq!(
            BASE64.decode(image.base64_payload()).unwrap(),
            b"not really a jpeg"
        );
    }

    #[test]
    fn test_from_path_accepts_unknown_types() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        file.write_all(&[0, 1, 2]).unwrap();

        let image = InlineImage::from_path(file.path()).unwrap();
        assert_eq!(image.mime_type(), Some(FALLBACK_MIME));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = InlineImage::from_path(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }
}
