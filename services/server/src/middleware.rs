//! Session-cookie authentication middleware
//!
//! Protected routes never see a request without a resolved user: the
//! middleware either attaches an [`AuthUser`] extension or ends the request.
//! Machine-facing routes answer 401; browser-facing routes redirect to the
//! login page.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{error::AppError, session::SESSION_COOKIE, state::AppState};

/// The authenticated user attached to a request by the middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

async fn resolve_session(state: &AppState, req: &Request<Body>) -> Option<Uuid> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    state.sessions.resolve(&token).await
}

/// Require a valid session; reject with 401 otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match resolve_session(&state, &req).await {
        Some(user_id) => {
            req.extensions_mut().insert(AuthUser(user_id));
            Ok(next.run(req).await)
        }
        None => Err(AppError::Unauthorized),
    }
}

/// Require a valid session; redirect to the login page otherwise.
pub async fn require_auth_or_login(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match resolve_session(&state, &req).await {
        Some(user_id) => {
            req.extensions_mut().insert(AuthUser(user_id));
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}
