pub mod jwt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejectionReason;
use axum_extra::TypedHeader;
use std::fmt::Debug;

use crate::error::{ApiError, ApiErrorCategory};
use crate::App;

pub use self::jwt::Claims;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// This object allows to extract identity based on the token given
/// from the `Authorization` HTTP header.
///
/// There are two kinds of identities that this object supports:
/// - `Guest` - They haven't provided a token.
/// - `User` - A verified set of identity claims.
pub enum Identity {
    Guest,
    User(Claims),
}

impl Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => f.write_str("Guest"),
            Self::User(..) => f.debug_struct("User").finish_non_exhaustive(),
        }
    }
}

impl Identity {
    pub fn requires_auth(&self) -> ApiResult<&Claims> {
        match self {
            Self::Guest => Err(ApiError::new(ApiErrorCategory::AccessDenied)),
            Self::User(claims) => Ok(claims),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for Identity {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let app = App::from_request_parts(parts, state).await?;
        let header_result: Result<TypedHeader<Authorization<Bearer>>, _> =
            TypedHeader::from_request_parts(parts, state).await;

        let token = match header_result {
            Ok(header) => header.token().to_string(),
            Err(error) if matches!(error.reason(), TypedHeaderRejectionReason::Missing) => {
                return Ok(Self::Guest)
            }
            Err(..) => {
                return Err(ApiError::new(ApiErrorCategory::AccessDenied).into_response());
            }
        };

        match Claims::decode(&app.config.jwt_secret, &token) {
            Ok(claims) => Ok(Self::User(claims)),
            Err(error) => Err(error.into_response()),
        }
    }
}
