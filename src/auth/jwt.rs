use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiErrorCategory};
use crate::model::UserId;

/// Identity claims carried by an externally issued bearer token.
///
/// Token issuance belongs to the identity provider; this server only
/// verifies the signature and reads the subject and email claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// External identity key of the authenticated user.
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn decode(secret: &str, token: &str) -> Result<Self, ApiError> {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        jsonwebtoken::decode::<Self>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|error| {
                ApiError::new(ApiErrorCategory::AccessDenied).detail(error.to_string())
            })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId(self.sub.clone())
    }
}

#[cfg(test)]
pub(crate) fn encode_for_tests(secret: &str, claims: &Claims) -> String {
    use jsonwebtoken::{EncodingKey, Header};

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
