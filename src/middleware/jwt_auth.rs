use crate::{
    app_state::AppState,
    error::{LedgerError, Result},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

/// Request extension storing the verified actor from the JWT.
/// What the actor may do is resolved separately through the capability port.
#[derive(Debug, Clone)]
pub struct ActorIdentity {
    pub actor_id: String,
}

/// JWT authentication middleware
///
/// Extracts the Authorization header, validates the bearer token,
/// and stores the verified actor in request extensions.
///
/// Returns 401 Unauthorized if the header is missing or token validation fails.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| LedgerError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        LedgerError::Unauthorized(
            "Invalid Authorization format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    let actor_id = state.jwt_service.validate_token(token)?;

    request.extensions_mut().insert(ActorIdentity { actor_id });

    Ok(next.run(request).await)
}

/// Axum extractor for the actor identity.
/// Only works on routes protected by jwt_auth_middleware.
impl<S> FromRequestParts<S> for ActorIdentity
where
    S: Send + Sync,
{
    type Rejection = LedgerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActorIdentity>()
            .cloned()
            .ok_or_else(|| {
                LedgerError::Unauthorized(
                    "Actor identity not found - route must be protected by jwt_auth_middleware"
                        .to_string(),
                )
            })
    }
}
