use mime::Mime;
use serde::Deserialize;
use std::path::PathBuf;

/// Storage target for profile photo uploads.
///
/// Injected into the upload pipeline as an explicit parameter object so
/// that deployments (and tests) can point it anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct Uploads {
    /// Directory where uploaded files are written.
    ///
    /// **Environment variables**:
    /// - `WAYPOINT_UPLOADS_DIR`
    #[serde(default = "Uploads::default_dir")]
    pub dir: PathBuf,
    /// Public URL prefix under which the uploads directory is served
    /// read-only.
    ///
    /// **Environment variables**:
    /// - `WAYPOINT_UPLOADS_PUBLIC_PREFIX`
    #[serde(default = "Uploads::default_public_prefix")]
    pub public_prefix: String,
    /// Size ceiling for a single uploaded file, in bytes.
    ///
    /// **Environment variables**:
    /// - `WAYPOINT_UPLOADS_MAX_SIZE`
    #[serde(default = "Uploads::default_max_size")]
    pub max_size: u64,
    /// MIME type allow-list for uploaded files.
    #[serde(default = "Uploads::default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Uploads {
    const DEFAULT_MAX_SIZE: u64 = 5 * 1024 * 1024; // 5 MiB

    // multipart framing overhead on top of the configured file ceiling
    const BODY_LIMIT_SLACK: u64 = 64 * 1024;

    fn default_dir() -> PathBuf {
        PathBuf::from("uploads")
    }

    fn default_public_prefix() -> String {
        "/uploads".to_string()
    }

    const fn default_max_size() -> u64 {
        Self::DEFAULT_MAX_SIZE
    }

    fn default_allowed_types() -> Vec<String> {
        vec![
            mime::IMAGE_JPEG.to_string(),
            mime::IMAGE_PNG.to_string(),
            mime::IMAGE_GIF.to_string(),
        ]
    }

    /// Request body ceiling for routes that accept an upload.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        (self.max_size + Self::BODY_LIMIT_SLACK) as usize
    }

    #[must_use]
    pub fn is_allowed(&self, mime: &Mime) -> bool {
        self.allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime.essence_str()))
    }
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            public_prefix: Self::default_public_prefix(),
            max_size: Self::default_max_size(),
            allowed_types: Self::default_allowed_types(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_leaves_room_for_multipart_framing() {
        let uploads = Uploads::default();
        assert_eq!(
            uploads.body_limit(),
            (uploads.max_size + 64 * 1024) as usize
        );
    }

    #[test]
    fn allow_list_covers_photo_types_only() {
        let uploads = Uploads::default();
        assert!(uploads.is_allowed(&mime::IMAGE_JPEG));
        assert!(uploads.is_allowed(&mime::IMAGE_PNG));
        assert!(uploads.is_allowed(&mime::IMAGE_GIF));
        assert!(!uploads.is_allowed(&mime::APPLICATION_PDF));
        assert!(!uploads.is_allowed(&mime::TEXT_PLAIN));
    }
}
