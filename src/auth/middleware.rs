use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::cookies::get_cookie_value;
use crate::error::AppError;
use crate::state::AppState;

/// Gate for protected routes: verifies the credential cookie and attaches the
/// caller's [`CallerId`](crate::extractors::CallerId) to the request.
///
/// Every rejection is the same 401 envelope. The reason is only logged.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_name = &state.config.auth.cookie_name;

    let caller = {
        let token = get_cookie_value(req.headers(), cookie_name).ok_or_else(|| {
            tracing::debug!("No credential presented for {}", req.uri().path());
            AppError::Unauthenticated
        })?;

        state.tokens.verify(token).map_err(|e| {
            tracing::warn!("Authentication failed for {}: {}", req.uri().path(), e);
            AppError::Unauthenticated
        })?
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
