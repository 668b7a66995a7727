// src/utils/session.rs

//! The one place that reads the `Authorization` header.
//!
//! `session_middleware` decodes the bearer token once per request and
//! stashes `Claims` in the request extensions. Handlers read them back
//! through `AuthUser` (login required, 401 otherwise) or `Viewer` (login
//! optional).

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    config::Config,
    error::AppError,
    utils::jwt::{Claims, verify_jwt},
};

/// Extracts the raw token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum Middleware: Session.
///
/// Applied to the whole API. Injects `Claims` when a valid token is
/// present; anonymous requests and requests with a stale token pass
/// through as anonymous. Routes that need a login take `AuthUser`.
pub async fn session_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| {
        verify_jwt(token, &config.jwt_secret)
            .inspect_err(|_| tracing::debug!("Ignoring invalid bearer token"))
            .ok()
    });

    if let Some(claims) = claims {
        req.extensions_mut().insert(claims);
    }
    next.run(req).await
}

/// Axum Middleware: Admin Authorization.
///
/// Must run inside `session_middleware`. Returns 401 for anonymous callers
/// and 403 unless the `Claims` carry the 'admin' role.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Login required".to_string()))?;

    if !claims.is_admin() {
        return Err(AppError::Forbidden("Admin only".to_string()));
    }

    Ok(next.run(req).await)
}

/// The logged-in caller. Rejects with 401 when there is no session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::AuthError("Login required".to_string()))?;
        let id = claims.user_id()?;
        Ok(AuthUser { id, claims })
    }
}

/// The (possibly anonymous) caller of a public route.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    /// User id of the caller, if logged in.
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(|c| c.user_id().ok())
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Claims>().cloned()))
    }
}
