use axum::{extract::State, http::StatusCode, Json};

use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, PublicUser, User};
use crate::state::AppState;

/// POST /auth/register - create a user account
///
/// Returns 201 with `{id, login}`; the password hash never leaves the
/// server. Duplicate logins surface as 409.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    if body.login.is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("login and password are required"));
    }

    let password_hash = hash_password(&body.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal("failed to hash password")
    })?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (login, password_hash) VALUES ($1, $2)
         RETURNING id, login, password_hash, created_at",
    )
    .bind(&body.login)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("login already taken")
        }
        _ => e.into(),
    })?;

    tracing::info!(user_id = user.id, "registered user {}", user.login);

    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            login: user.login,
        }),
    ))
}

/// POST /auth/login - verify credentials and issue a token
///
/// Unknown login and wrong password produce the identical 401 so the
/// endpoint cannot be used to enumerate accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    if body.login.is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("login and password are required"));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, login, password_hash, created_at FROM users WHERE login = $1",
    )
    .bind(&body.login)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(invalid_credentials)?;

    let matches = verify_password(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        ApiError::internal("failed to verify password")
    })?;

    if !matches {
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(user.id, &user.login).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::internal("failed to sign token")
    })?;

    Ok(Json(AuthResponse {
        token,
        user: PublicUser {
            id: user.id,
            login: user.login,
        },
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid credentials")
}
