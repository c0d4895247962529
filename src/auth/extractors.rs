use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{claims::Role, claims::SessionClaim, guard::Decision};
use crate::{errors::AppError, state::AppState};

/// Validated session of the caller. Any role passes.
pub struct AuthUser(pub SessionClaim);

/// Validated session that carries the `admin` role.
pub struct AdminUser(pub SessionClaim);

/// JSON body whose parse failures come back as `AppError::Validation`.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "request body rejected");
                Err(AppError::Validation(rejection.body_text()))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::MissingToken)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::MissingToken)?;

        let claim = state.auth.authenticate(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::from(e)
        })?;

        match state.auth.authorize(&claim, Role::User) {
            Decision::Allow => Ok(AuthUser(claim)),
            Decision::Deny => Err(AppError::Forbidden),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claim) = AuthUser::from_request_parts(parts, state).await?;
        match state.auth.authorize(&claim, Role::Admin) {
            Decision::Allow => Ok(AdminUser(claim)),
            Decision::Deny => {
                warn!(user_id = claim.subject_id, "admin route denied");
                Err(AppError::Forbidden)
            }
        }
    }
}
