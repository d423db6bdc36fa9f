use crate::auth::Claims;
use crate::error::{ApiError, ApiErrorCategory};
use crate::model::User;
use crate::util;
use crate::App;

/// Availability lookup for a custom user ID. An empty or absent value
/// means no constraint was requested and reports available.
#[derive(Debug)]
pub struct CheckCustomId<'a> {
    pub claims: &'a Claims,
    pub custom_user_id: Option<&'a str>,
}

impl CheckCustomId<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.check_custom_id")]
    pub async fn perform(self, app: &App) -> Result<bool, ApiError> {
        let Some(value) = self.custom_user_id.filter(|v| !v.is_empty()) else {
            return Ok(true);
        };

        let id = self.claims.user_id();
        let mut conn = app.db_read().await?;
        let taken = User::is_custom_id_taken(&mut *conn, &id, value).await?;
        Ok(!taken)
    }
}

/// Availability lookup for a username, with a format gate in front:
/// bad format is a validation failure, not a lookup result.
#[derive(Debug)]
pub struct CheckUsername<'a> {
    pub claims: &'a Claims,
    pub username: &'a str,
}

impl CheckUsername<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.check_username")]
    pub async fn perform(self, app: &App) -> Result<bool, ApiError> {
        if !util::is_valid_username(self.username) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest).message(
                "Username must be 1-30 characters long and contain only letters, numbers and underscores",
            ));
        }

        let id = self.claims.user_id();
        let mut conn = app.db_read().await?;
        let taken = User::is_custom_id_taken(&mut *conn, &id, self.username).await?;
        Ok(!taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_claims;

    #[tokio::test]
    async fn empty_custom_id_reports_available() {
        let app = App::new_for_tests();
        let claims = sample_claims();

        for value in [None, Some("")] {
            let request = CheckCustomId {
                claims: &claims,
                custom_user_id: value,
            };
            assert!(request.perform(&app).await.unwrap());
        }
    }

    #[tokio::test]
    async fn malformed_username_is_a_validation_failure() {
        let app = App::new_for_tests();
        let claims = sample_claims();

        for username in ["ab cd", "", "name!", &"a".repeat(31)] {
            let request = CheckUsername {
                claims: &claims,
                username,
            };
            let error = request.perform(&app).await.unwrap_err();
            assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
        }
    }
}
