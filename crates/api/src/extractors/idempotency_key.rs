//! Idempotency key header extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// The header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const MAX_KEY_LEN: usize = 255;

/// Required `Idempotency-Key` header.
///
/// The raw client value is kept; the gate hashes it before building store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey(pub String);

fn parse(parts: &Parts) -> Result<IdempotencyKey, ApiError> {
    let value = parts
        .headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .ok_or_else(|| ApiError::Validation("Idempotency-Key header is required".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Validation("Idempotency-Key must be visible ASCII".to_string()))?
        .trim();

    if value.is_empty() {
        return Err(ApiError::Validation(
            "Idempotency-Key header is required".to_string(),
        ));
    }
    if value.len() > MAX_KEY_LEN {
        return Err(ApiError::Validation(format!(
            "Idempotency-Key must be at most {MAX_KEY_LEN} characters"
        )));
    }
    Ok(IdempotencyKey(value.to_string()))
}

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(value: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = value {
            builder = builder.header("Idempotency-Key", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_header_is_case_insensitive_and_trimmed() {
        assert_eq!(
            parse(&parts_with(Some(" key-A "))).unwrap(),
            IdempotencyKey("key-A".to_string())
        );
    }

    #[test]
    fn test_missing_or_blank_header_rejected() {
        assert!(matches!(parse(&parts_with(None)), Err(ApiError::Validation(_))));
        assert!(matches!(parse(&parts_with(Some("  "))), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_oversized_header_rejected() {
        let long = "k".repeat(MAX_KEY_LEN + 1);
        assert!(parse(&parts_with(Some(&long))).is_err());
    }

    #[test]
    fn test_header_constant() {
        assert_eq!(IDEMPOTENCY_KEY_HEADER, "idempotency-key");
    }
}
