use tracing::warn;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::model::{User, UserProfile};
use crate::{uploads, App};

/// Deletes the caller's account: profile row, then user row, in one
/// transaction. The stored photo file is removed only after the commit
/// and only best-effort; the account deletion already succeeded.
#[derive(Debug)]
pub struct DeleteUser<'a> {
    pub claims: &'a Claims,
}

impl DeleteUser<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.delete_user")]
    pub async fn perform(self, app: &App) -> Result<(), ApiError> {
        let id = self.claims.user_id();

        let mut tx = app.db_write().await?;
        let photo_url = User::photo_url(&mut *tx, &id).await?.flatten();
        UserProfile::delete(&mut *tx, &id).await?;
        User::delete(&mut *tx, &id).await?;
        tx.commit().await?;

        if let Some(photo_url) = photo_url {
            if let Err(error) = uploads::remove_by_url(&app.config.uploads, &photo_url).await {
                warn!(%error, %photo_url, "could not remove photo of deleted account");
            }
        }

        Ok(())
    }
}
