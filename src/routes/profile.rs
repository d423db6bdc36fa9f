use axum::extract::{Multipart, Path, Query};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Identity;
use crate::error::{ApiError, ApiErrorCategory};
use crate::extract::Json;
use crate::{services, App};

#[derive(Debug, Serialize)]
struct AvailableResponse {
    available: bool,
}

#[derive(Debug, Serialize)]
struct PhotoResponse {
    photo_url: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

pub async fn get_profile(app: App, identity: Identity) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::GetProfile { claims };
    let profile = request.perform(&app).await?;

    Ok(Json(profile).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileForm {
    pub display_name: Option<String>,
    pub custom_user_id: Option<String>,
    pub major: Option<String>,
    pub interests: Option<Vec<String>>,
}

pub async fn update_profile(
    app: App,
    identity: Identity,
    Json(form): Json<UpdateProfileForm>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::UpdateProfile {
        claims,
        display_name: form.display_name.as_deref(),
        custom_user_id: form.custom_user_id.as_deref(),
        major: form.major.as_deref(),
        interests: form.interests.as_deref(),
    };
    let profile = request.perform(&app).await?;

    Ok(Json(profile).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssessmentForm {
    pub results: Value,
}

pub async fn update_assessment(
    app: App,
    identity: Identity,
    Json(form): Json<UpdateAssessmentForm>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::UpdateAssessment {
        claims,
        results: form.results,
    };
    let profile = request.perform(&app).await?;

    Ok(Json(profile).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DeleteAssessmentsForm {
    pub dates: Vec<String>,
}

pub async fn delete_assessment_results(
    app: App,
    identity: Identity,
    Json(form): Json<DeleteAssessmentsForm>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::DeleteAssessmentResults {
        claims,
        dates: &form.dates,
    };
    let profile = request.perform(&app).await?;

    Ok(Json(profile).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomIdForm {
    pub custom_user_id: String,
}

pub async fn update_custom_id(
    app: App,
    identity: Identity,
    Json(form): Json<UpdateCustomIdForm>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::UpdateCustomId {
        claims,
        custom_user_id: &form.custom_user_id,
    };
    let user = request.perform(&app).await?;

    Ok(Json(user).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CheckCustomIdQuery {
    pub custom_user_id: Option<String>,
}

pub async fn check_custom_id(
    app: App,
    identity: Identity,
    Query(query): Query<CheckCustomIdQuery>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::CheckCustomId {
        claims,
        custom_user_id: query.custom_user_id.as_deref(),
    };
    let available = request.perform(&app).await?;

    Ok(Json(AvailableResponse { available }).into_response())
}

pub async fn check_username(
    app: App,
    identity: Identity,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::CheckUsername {
        claims,
        username: &username,
    };
    let available = request.perform(&app).await?;

    Ok(Json(AvailableResponse { available }).into_response())
}

pub async fn update_photo(
    app: App,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        ApiError::new(ApiErrorCategory::InvalidRequest).message(error.body_text())
    })? {
        if field.name() != Some("photo") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|error| {
            ApiError::new(ApiErrorCategory::InvalidRequest).message(error.body_text())
        })?;

        upload = Some((original_name, content_type, data));
        break;
    }

    let Some((original_name, content_type, data)) = upload else {
        return Err(ApiError::new(ApiErrorCategory::InvalidRequest).message("No file uploaded"));
    };

    let request = services::profile::UpdateProfilePhoto {
        claims,
        original_name,
        content_type,
        data,
    };
    let photo_url = request.perform(&app).await?;

    Ok(Json(PhotoResponse { photo_url }).into_response())
}

pub async fn delete_user(app: App, identity: Identity) -> Result<Response, ApiError> {
    let claims = identity.requires_auth()?;

    let request = services::profile::DeleteUser { claims };
    request.perform(&app).await?;

    Ok(Json(MessageResponse {
        message: "Account deleted",
    })
    .into_response())
}
