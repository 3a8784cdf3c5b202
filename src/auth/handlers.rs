use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::{params, OptionalExtension};

use crate::api::{Credentials, Envelope, UserData};
use crate::auth::cookies::{clear_credential_cookie, credential_cookie};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::AppJson;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_USERNAME_LEN: usize = 30;

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Username must be 1 to {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_' and '.'".into(),
        ));
    }
    Ok(())
}

/// POST /api/v1/user/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<Credentials>,
) -> AppResult<Response> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = bcrypt::hash(&req.password, state.config.auth.bcrypt_cost)?;
    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        username,
        password_hash,
    };

    let conn = state.db.get()?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
        params![user.id, user.username, user.password_hash],
    )?;
    if inserted == 0 {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    tracing::info!("Registered user {}", user.username);
    Ok(Json(Envelope::ok(
        "Account created successfully",
        UserData {
            user: user.author(),
        },
    ))
    .into_response())
}

/// POST /api/v1/user/login: verify the password and set the credential cookie.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<Credentials>,
) -> AppResult<Response> {
    let user = {
        let conn = state.db.get()?;
        conn.query_row(
            "SELECT id, username, password_hash FROM users WHERE username = ?1",
            params![req.username.trim()],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        )
        .optional()?
    };

    let hash = user
        .as_ref()
        .map_or(&*state.login_decoy, |u| u.password_hash.as_str());
    let password_ok = bcrypt::verify(&req.password, hash)?;

    let user = match user {
        Some(user) if password_ok => user,
        _ => return Err(AppError::InvalidCredentials),
    };

    let token = state
        .tokens
        .issue(&user.id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let cookie = credential_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.token_hours,
    );

    tracing::info!("User {} logged in", user.username);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(Envelope::ok(
            format!("Welcome back {}", user.username),
            UserData {
                user: user.author(),
            },
        )),
    )
        .into_response())
}

/// GET /api/v1/user/logout: drop the client's copy of the credential.
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(
            header::SET_COOKIE,
            clear_credential_cookie(&state.config.auth.cookie_name),
        )],
        Json(Envelope::done("Logged out successfully")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("ana").is_ok());
        assert!(validate_username("ana_b.c9").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }
}
