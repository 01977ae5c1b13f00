//! Bearer token authentication extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::str::FromStr;

use domain::models::UserType;
use shared::jwt::{extract_user_id, JwtConfig, JwtError};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::get_request_id;

/// Authenticated caller, decoded from the `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: i64,
    pub user_type: UserType,
    /// JWT ID (jti) for log correlation.
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and returns the caller.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, ApiError> {
        let claims = jwt.validate_token(token).map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
        })?;

        let user_id = extract_user_id(&claims)
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;
        let user_type = UserType::from_str(&claims.user_type)
            .map_err(|_| ApiError::Unauthorized("Invalid user type in token".to_string()))?;

        Ok(Self {
            user_id,
            user_type,
            jti: claims.jti,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        let auth = UserAuth::validate(&state.jwt, bearer_token(parts)?)?;
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// Caller whose token says `user_type = manager`.
///
/// Per-apartment manager rights are still checked by the services.
#[derive(Debug, Clone)]
pub struct ManagerAuth(pub UserAuth);

#[async_trait]
impl FromRequestParts<AppState> for ManagerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = UserAuth::from_request_parts(parts, state).await?;
        if auth.user_type != UserType::Manager {
            tracing::warn!(
                user_id = auth.user_id,
                request_id = %get_request_id(&parts.extensions),
                "Resident attempted manager route"
            );
            return Err(ApiError::Forbidden("Manager account required".to_string()));
        }
        Ok(ManagerAuth(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn jwt() -> JwtConfig {
        JwtConfig::new("extractor-test-secret", 900, 0).unwrap()
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/resident/apartments");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_validate_round_trip() {
        let jwt = jwt();
        let (token, jti) = jwt.generate_access_token(17, "manager").unwrap();

        let auth = UserAuth::validate(&jwt, &token).unwrap();
        assert_eq!(auth.user_id, 17);
        assert_eq!(auth.user_type, UserType::Manager);
        assert_eq!(auth.jti, jti);
    }

    #[test]
    fn test_validate_rejects_unknown_user_type() {
        let jwt = jwt();
        let (token, _) = jwt.generate_access_token(17, "superuser").unwrap();
        assert!(matches!(
            UserAuth::validate(&jwt, &token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_validate_rejects_foreign_token() {
        let other = JwtConfig::new("someone-elses-secret", 900, 0).unwrap();
        let (token, _) = other.generate_access_token(1, "resident").unwrap();
        assert!(UserAuth::validate(&jwt(), &token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert!(bearer_token(&parts_with(None)).is_err());
        assert!(bearer_token(&parts_with(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts_with(Some("Bearer   "))).is_err());
    }
}
