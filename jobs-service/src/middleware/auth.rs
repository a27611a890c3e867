use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::AppState;

/// Authenticated caller, attached to request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub name: String,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Require a valid bearer token. Every failure is `Unauthenticated`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthenticated)?;

    let claims = state.jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Token verification failed");
        AppError::Unauthenticated
    })?;

    tracing::Span::current().record("user_id", claims.sub.as_str());

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        name: claims.name,
    });

    Ok(next.run(req).await)
}

/// Extractor for the caller of an authenticated route.
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<AuthContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "AuthContext missing from request extensions"
            ))
        })?;

        Ok(AuthUser(context.clone()))
    }
}
