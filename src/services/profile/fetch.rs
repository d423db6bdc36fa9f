use crate::auth::Claims;
use crate::error::ApiError;
use crate::model::{Profile, User, UserProfile};
use crate::App;

/// Fetches the caller's combined profile record, lazily creating the
/// backing rows on first access.
#[derive(Debug)]
pub struct GetProfile<'a> {
    pub claims: &'a Claims,
}

impl GetProfile<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.get")]
    pub async fn perform(self, app: &App) -> Result<Profile, ApiError> {
        let id = self.claims.user_id();

        {
            let mut conn = app.db_read().await?;
            if let Some(profile) = Profile::find(&mut *conn, &id).await? {
                return Ok(profile);
            }
        }

        // First-time caller: bootstrap both rows in one transaction.
        // Both inserts are conflict-tolerant, so racing requests for
        // the same user settle on a single pair of rows.
        let mut tx = app.db_write().await?;
        User::insert_if_missing(
            &mut *tx,
            &id,
            self.claims.email.as_deref(),
            self.claims.name.as_deref(),
        )
        .await?;
        UserProfile::insert_if_missing(&mut *tx, &id).await?;
        tx.commit().await?;

        let mut conn = app.db_read().await?;
        Profile::find(&mut *conn, &id)
            .await?
            .ok_or_else(|| ApiError::unknown().detail("profile row missing after bootstrap"))
    }
}
