// =============================================================================
// Operator Token: Bearer auth for control endpoints
// =============================================================================
//
// Read-only analytics routes are open.  Anything that changes how cycles run
// (kill switch, engine flags) needs `Authorization: Bearer <token>` matching
// `NIFTY_ADMIN_TOKEN`.  An unset token rejects every control request.
// =============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

pub const ADMIN_TOKEN_ENV: &str = "NIFTY_ADMIN_TOKEN";

/// Byte comparison that always walks the full length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

/// Check an `Authorization` header value against the expected token.
pub fn authorize(header: Option<&str>, expected: &str) -> Result<(), AuthRejection> {
    if expected.is_empty() {
        return Err(AuthRejection {
            message: "Operator token not configured",
        });
    }
    let token = header
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthRejection {
            message: "Missing or invalid authorization token",
        })?;
    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(AuthRejection {
            message: "Invalid authorization token",
        });
    }
    Ok(())
}

/// Extractor guarding control handlers.
pub struct OperatorAuth;

#[async_trait]
impl<S> FromRequestParts<S> for OperatorAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let expected = std::env::var(ADMIN_TOKEN_ENV).unwrap_or_default();
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        authorize(header, &expected).map_err(|rejection| {
            warn!(reason = rejection.message, "control request rejected");
            rejection
        })?;
        Ok(OperatorAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_token() {
        assert!(authorize(Some("Bearer s3cret"), "s3cret").is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_token() {
        assert!(authorize(Some("Bearer nope"), "s3cret").is_err());
        assert!(authorize(Some("s3cret"), "s3cret").is_err());
        assert!(authorize(None, "s3cret").is_err());
    }

    #[test]
    fn unset_token_rejects_everything() {
        assert!(authorize(Some("Bearer "), "").is_err());
    }

    #[test]
    fn comparison() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
