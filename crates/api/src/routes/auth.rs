use anyhow::anyhow;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use bragger_common::{hash_password, parse_expiry, sign_token, verify_password, EnvVars};
use bragger_core::User;
use bragger_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::middleware::{authenticate, AuthUser};
use crate::response::{AppError, AppSuccess};
use crate::{ApiServerEnv, GlobalState};

pub fn auth_routes() -> Router<GlobalState> {
    Router::new()
        .route("/auth/register",
            post(register)
        )
        .route("/auth/login",
            post(login)
        )

        .route("/auth/profile",
            get(profile)
            .route_layer(middleware::from_fn(authenticate))
        )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

async fn register(
    State(state): State<GlobalState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<AppSuccess, AppError> {
    let pool = state.pool();

    let existing = User::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("email", "=", payload.email.clone()),
        pool,
    )
    .await?;
    if existing.is_some() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("User with this email already exists"),
        ));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let user = User::new(payload.email, payload.name, password_hash)
        .create(pool)
        .await?;

    let token = issue_token(&user)?;
    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "User registered successfully",
        json!({
            "user": user,
            "token": token,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<GlobalState>,
    Json(payload): Json<LoginRequest>,
) -> Result<AppSuccess, AppError> {
    let pool = state.pool();

    let user = User::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("email", "=", payload.email.clone()),
        pool,
    )
    .await?
    .ok_or_else(|| {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("Invalid email or password"),
        )
    })?;

    let password_valid = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    if !password_valid {
        return Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("Invalid email or password"),
        ));
    }

    let token = issue_token(&user)?;
    Ok(AppSuccess::new(
        StatusCode::OK,
        "Login successful",
        json!({
            "user": user,
            "token": token,
        }),
    ))
}

async fn profile(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<AppSuccess, AppError> {
    let user = User::find_by_id(user_id, state.pool())
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("User not found")))?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Profile fetched successfully",
        json!(user),
    ))
}

fn issue_token(user: &User) -> Result<String, AppError> {
    let env = ApiServerEnv::load();
    let expires_in = parse_expiry(&env.jwt_expires_in)?;
    Ok(sign_token(&user.id.to_string(), &env.jwt_secret, expires_in)?)
}
