use mime::Mime;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::config::Uploads;
use crate::error::{ApiError, ApiErrorCategory};
use crate::model::User;
use crate::App;

const FILENAME_LEN: usize = 24;
const FILENAME_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug)]
pub struct StoredPhoto {
    pub filename: String,
    pub public_url: String,
}

/// Generates a random filename, preserving the extension of the
/// original upload so the served file keeps a sensible type.
#[must_use]
pub fn generate_filename(original: &str) -> String {
    let stem = random_string::generate(FILENAME_LEN, FILENAME_CHARSET);
    match Path::new(original).extension().and_then(OsStr::to_str) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{}", ext.to_ascii_lowercase()),
        _ => stem,
    }
}

#[must_use]
pub fn public_url(cfg: &Uploads, filename: &str) -> String {
    format!("{}/{filename}", cfg.public_prefix.trim_end_matches('/'))
}

/// Validates and writes an uploaded photo into the configured uploads
/// directory. Validation happens before anything touches the disk or
/// the database.
#[tracing::instrument(skip(cfg, data), fields(size = data.len()))]
pub async fn store_photo(
    cfg: &Uploads,
    original_name: &str,
    content_type: &str,
    data: &[u8],
) -> Result<StoredPhoto, ApiError> {
    let mime = content_type.parse::<Mime>().map_err(|_| {
        ApiError::new(ApiErrorCategory::InvalidRequest)
            .message(format!("Unrecognized content type: {content_type}"))
    })?;

    if !cfg.is_allowed(&mime) {
        return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
            .message("Only JPEG, PNG and GIF images are allowed"));
    }

    if data.len() as u64 > cfg.max_size {
        return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
            .message(format!("File too large (limit is {} bytes)", cfg.max_size)));
    }

    tokio::fs::create_dir_all(&cfg.dir).await?;

    let filename = generate_filename(original_name);
    tokio::fs::write(cfg.dir.join(&filename), data).await?;

    let public_url = public_url(cfg, &filename);
    Ok(StoredPhoto {
        filename,
        public_url,
    })
}

/// Removes the file a stored photo URL points at. Only the final path
/// component is honored so a stored URL can never escape the uploads
/// directory.
pub async fn remove_by_url(cfg: &Uploads, photo_url: &str) -> std::io::Result<()> {
    let Some(filename) = Path::new(photo_url).file_name() else {
        return Ok(());
    };
    tokio::fs::remove_file(cfg.dir.join(filename)).await
}

static SWEEP_EPOCH: Lazy<SystemTime> = Lazy::new(SystemTime::now);

/// Deletes files in the uploads directory that no user row references
/// anymore. Replacement and account deletion only remove files
/// best-effort, so this sweep is what eventually reclaims the misses.
///
/// Only files from before this process started are considered: an
/// upload written concurrently may not have its database reference
/// committed yet.
#[tracing::instrument(skip_all, name = "uploads.sweep_orphans")]
pub async fn sweep_orphans(app: &App) -> Result<u64, ApiError> {
    sweep_orphans_before(app, *SWEEP_EPOCH).await
}

async fn sweep_orphans_before(app: &App, cutoff: SystemTime) -> Result<u64, ApiError> {
    let cfg = &app.config.uploads;

    let mut entries = match tokio::fs::read_dir(&cfg.dir).await {
        Ok(entries) => entries,
        // Nothing was ever uploaded.
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(error) => return Err(error.into()),
    };

    let mut conn = app.db_read().await?;
    let referenced = User::all_photo_urls(&mut *conn)
        .await?
        .into_iter()
        .filter_map(|url| {
            Path::new(&url)
                .file_name()
                .and_then(OsStr::to_str)
                .map(str::to_string)
        })
        .collect::<HashSet<_>>();
    drop(conn);

    let mut removed = 0u64;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if referenced.contains(name) {
            continue;
        }

        // Unknown mtime counts as in-flight and is left alone.
        match entry.metadata().await.and_then(|meta| meta.modified()) {
            Ok(modified) if modified < cutoff => {}
            _ => continue,
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(filename = %name, "removed orphaned upload");
                removed += 1;
            }
            Err(error) => warn!(%error, filename = %name, "could not remove orphaned upload"),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn temp_uploads() -> config::Uploads {
        let dir = std::env::temp_dir().join(format!(
            "waypoint-test-{}",
            random_string::generate(12, FILENAME_CHARSET)
        ));
        config::Uploads {
            dir,
            ..config::Uploads::default()
        }
    }

    #[test]
    fn filenames_preserve_extension() {
        let name = generate_filename("portrait.PNG");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), FILENAME_LEN + 4);

        let bare = generate_filename("noextension");
        assert_eq!(bare.len(), FILENAME_LEN);

        // Two generated names must not collide.
        assert_ne!(generate_filename("a.jpg"), generate_filename("a.jpg"));
    }

    #[test]
    fn public_urls_join_cleanly() {
        let mut cfg = config::Uploads::default();
        assert_eq!(public_url(&cfg, "abc.png"), "/uploads/abc.png");

        cfg.public_prefix = "/static/uploads/".into();
        assert_eq!(public_url(&cfg, "abc.png"), "/static/uploads/abc.png");
    }

    #[tokio::test]
    async fn stores_allowed_photo() {
        let cfg = temp_uploads();
        let stored = store_photo(&cfg, "me.jpg", "image/jpeg", b"not really a jpeg")
            .await
            .unwrap();

        assert!(stored.filename.ends_with(".jpg"));
        assert_eq!(stored.public_url, format!("/uploads/{}", stored.filename));

        let on_disk = tokio::fs::read(cfg.dir.join(&stored.filename)).await.unwrap();
        assert_eq!(on_disk, b"not really a jpeg");

        tokio::fs::remove_dir_all(&cfg.dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_disallowed_type_before_writing() {
        let cfg = temp_uploads();
        let error = store_photo(&cfg, "paper.pdf", "application/pdf", b"%PDF-1.4")
            .await
            .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
        // Nothing was written, not even the directory.
        assert!(!cfg.dir.exists());
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let mut cfg = temp_uploads();
        cfg.max_size = 8;

        let error = store_photo(&cfg, "big.png", "image/png", b"123456789")
            .await
            .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
        assert!(!cfg.dir.exists());
    }

    #[tokio::test]
    async fn sweep_spares_files_written_after_the_cutoff() {
        let app = crate::test_utils::build_test_app().await;
        let dir = app.config.uploads.dir.clone();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("inflight.png"), b"fresh")
            .await
            .unwrap();

        let removed = sweep_orphans_before(&app, SystemTime::UNIX_EPOCH)
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(dir.join("inflight.png").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_stale_orphans_but_keeps_referenced_files() {
        use crate::model::UserId;

        let app = crate::test_utils::build_test_app().await;
        let dir = app.config.uploads.dir.clone();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("keep.png"), b"referenced")
            .await
            .unwrap();
        tokio::fs::write(dir.join("orphan.png"), b"orphan")
            .await
            .unwrap();

        let id = UserId::from("uid-1234");
        let mut tx = app.db_write().await.unwrap();
        User::insert_if_missing(&mut *tx, &id, None, None)
            .await
            .unwrap();
        User::set_photo_url(&mut *tx, &id, "/uploads/keep.png")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let cutoff = SystemTime::now() + std::time::Duration::from_secs(3600);
        let removed = sweep_orphans_before(&app, cutoff).await.unwrap();

        assert_eq!(removed, 1);
        assert!(dir.join("keep.png").exists());
        assert!(!dir.join("orphan.png").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn removing_a_missing_file_reports_the_error() {
        let cfg = temp_uploads();
        assert!(remove_by_url(&cfg, "/uploads/never-existed.png")
            .await
            .is_err());
    }
}
