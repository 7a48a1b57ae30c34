//! Shared-secret bearer authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sprinkler_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Holds the SHA-256 digest of the configured API token.
///
/// Presented tokens are hashed and the fixed-length digests compared, so the
/// comparison time does not depend on how much of the token matched.
#[derive(Clone)]
pub struct TokenVerifier {
    digest: [u8; 32],
}

impl TokenVerifier {
    pub fn new(token: &str) -> Self {
        Self {
            digest: sha256(token),
        }
    }

    pub fn verify(&self, candidate: &str) -> bool {
        sha256(candidate)
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

fn sha256(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Extractor that rejects requests without `Authorization: Bearer <token>`.
///
/// ```ignore
/// async fn my_handler(_auth: RequireToken) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireToken;

impl FromRequestParts<AppState> for RequireToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.trim().strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if !state.auth.verify(token.trim()) {
            tracing::warn!("Rejected request with invalid API token");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Missing or invalid token".into(),
            )));
        }

        Ok(RequireToken)
    }
}
