use crate::auth::Claims;
use crate::error::{ApiError, ApiErrorCategory};
use crate::model::{Profile, User, UserProfile};
use crate::util;
use crate::App;

/// Updates the caller's identity fields and profile fields in one
/// transaction.
#[derive(Debug)]
pub struct UpdateProfile<'a> {
    pub claims: &'a Claims,
    pub display_name: Option<&'a str>,
    pub custom_user_id: Option<&'a str>,
    pub major: Option<&'a str>,
    pub interests: Option<&'a [String]>,
}

impl UpdateProfile<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.update")]
    pub async fn perform(self, app: &App) -> Result<Profile, ApiError> {
        let Some(display_name) = self.display_name.filter(|name| !util::is_blank(name)) else {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Display name is required"));
        };

        let id = self.claims.user_id();
        let interests = self.interests.unwrap_or(&[]);

        let mut tx = app.db_write().await?;
        User::update_identity(&mut *tx, &id, self.custom_user_id, display_name).await?;
        UserProfile::update(&mut *tx, &id, self.major, interests).await?;
        tx.commit().await?;

        let mut conn = app.db_read().await?;
        Profile::find(&mut *conn, &id)
            .await?
            .ok_or_else(|| ApiError::new(ApiErrorCategory::NotFound).message("Profile not found"))
    }
}
