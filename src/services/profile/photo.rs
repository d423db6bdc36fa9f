use bytes::Bytes;
use tracing::warn;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::model::User;
use crate::{uploads, App};

/// Stores an uploaded profile photo and persists its public URL on the
/// user row. Validation happens before any filesystem or database
/// write.
pub struct UpdateProfilePhoto<'a> {
    pub claims: &'a Claims,
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl std::fmt::Debug for UpdateProfilePhoto<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateProfilePhoto")
            .field("original_name", &self.original_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl UpdateProfilePhoto<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.update_photo")]
    pub async fn perform(self, app: &App) -> Result<String, ApiError> {
        let id = self.claims.user_id();
        let cfg = &app.config.uploads;

        let stored =
            uploads::store_photo(cfg, &self.original_name, &self.content_type, &self.data).await?;

        let mut tx = app.db_write().await?;
        let previous = User::photo_url(&mut *tx, &id).await?;
        if User::set_photo_url(&mut *tx, &id, &stored.public_url).await? == 0 {
            // First contact through the photo endpoint: bootstrap the
            // user row and retry the write.
            User::insert_if_missing(
                &mut *tx,
                &id,
                self.claims.email.as_deref(),
                self.claims.name.as_deref(),
            )
            .await?;
            User::set_photo_url(&mut *tx, &id, &stored.public_url).await?;
        }
        tx.commit().await?;

        // The replaced file is no longer referenced. Removal is
        // best-effort; the startup sweep reclaims anything missed here.
        if let Some(Some(previous)) = previous {
            if previous != stored.public_url {
                if let Err(error) = uploads::remove_by_url(cfg, &previous).await {
                    warn!(%error, photo_url = %previous, "could not remove replaced photo");
                }
            }
        }

        Ok(stored.public_url)
    }
}
