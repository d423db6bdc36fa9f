use crate::auth::Claims;
use crate::error::{ApiError, ApiErrorCategory};
use crate::model::User;
use crate::App;

/// Sets the caller's custom user ID after checking nobody else holds
/// it. The schema-level unique constraint is the authoritative guard;
/// the pre-check only exists to produce a friendlier message. A racing
/// write that slips past the pre-check surfaces as the same conflict
/// through the unique-violation mapping.
#[derive(Debug)]
pub struct UpdateCustomId<'a> {
    pub claims: &'a Claims,
    pub custom_user_id: &'a str,
}

impl UpdateCustomId<'_> {
    #[tracing::instrument(skip(app), name = "services.profile.update_custom_id")]
    pub async fn perform(self, app: &App) -> Result<User, ApiError> {
        if self.custom_user_id.is_empty() {
            return Err(
                ApiError::new(ApiErrorCategory::InvalidRequest).message("Custom ID is required")
            );
        }

        let id = self.claims.user_id();

        let mut tx = app.db_write().await?;
        if User::is_custom_id_taken(&mut *tx, &id, self.custom_user_id).await? {
            return Err(
                ApiError::new(ApiErrorCategory::Conflict).message("Custom ID already taken")
            );
        }

        let user = User::set_custom_id(&mut *tx, &id, self.custom_user_id)
            .await
            .map_err(|error| {
                let error = ApiError::from(error);
                if error.category == ApiErrorCategory::Conflict {
                    error.message("Custom ID already taken")
                } else {
                    error
                }
            })?
            .ok_or_else(|| ApiError::new(ApiErrorCategory::NotFound).message("User not found"))?;
        tx.commit().await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::GetProfile;
    use crate::test_utils::{self, sample_claims};

    #[tokio::test]
    async fn rejects_empty_custom_id() {
        let app = App::new_for_tests();
        let claims = sample_claims();

        let request = UpdateCustomId {
            claims: &claims,
            custom_user_id: "",
        };

        let error = request.perform(&app).await.unwrap_err();
        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
    }

    #[tokio::test]
    async fn concurrent_claims_yield_exactly_one_winner() {
        let app = test_utils::build_test_app().await;
        let alice = test_utils::claims_for("uid-alice", "alice@example.com", "Alice");
        let bob = test_utils::claims_for("uid-bob", "bob@example.com", "Bob");

        GetProfile { claims: &alice }.perform(&app).await.unwrap();
        GetProfile { claims: &bob }.perform(&app).await.unwrap();

        let (first, second) = tokio::join!(
            UpdateCustomId {
                claims: &alice,
                custom_user_id: "waypoint",
            }
            .perform(&app),
            UpdateCustomId {
                claims: &bob,
                custom_user_id: "waypoint",
            }
            .perform(&app),
        );

        let (winner, loser) = if first.is_ok() {
            (first, second)
        } else {
            (second, first)
        };

        let user = winner.unwrap();
        assert_eq!(user.custom_user_id.as_deref(), Some("waypoint"));

        let error = loser.unwrap_err();
        assert_eq!(error.category, ApiErrorCategory::Conflict);
    }
}
