use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time},
};
use validator::Validate;

use crate::{
    Config,
    auth::{self, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository,
        entity::{
            PasswordResetToken, RefreshToken, Rotation, UserEntity, UserEntityCreateUpdate,
            UserProfile,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::{
            ChangePasswordBody, ForgotPasswordBody, LoginBody, RegisterBody, ResetPasswordBody,
            SessionResponse, UserWithProfile,
        },
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN, REFRESH_TOKEN},
        routes::{db_err, found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/logout-all", post(logout_all_handler))
        .route("/auth/password/forgot", post(forgot_password_handler))
        .route("/auth/password/reset", post(reset_password_handler))
        .route("/auth/password/change", post(change_password_handler))
        .route("/auth/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn session_cookie(name: &'static str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(ttl.num_seconds()));
    cookie
}

fn clear_session(cookies: &Cookies) {
    for name in [AUTH_TOKEN, REFRESH_TOKEN] {
        cookies.remove(Cookie::build((name, "")).path("/").build());
    }
}

/// Signs an access token for `user` and stores it plus `refresh` in cookies.
async fn start_session(
    cookies: &Cookies,
    user: UserEntity,
    refresh: String,
) -> WebResult<SessionResponse> {
    let config = Config::get_or_init(false).await;
    let access_ttl = config.auth().access_token_ttl();

    let claims = UserClaims::new(user.id(), user.role().to_string(), access_ttl);
    let access_token = auth::generate_token(claims, config.app().jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    cookies.add(session_cookie(AUTH_TOKEN, access_token.clone(), access_ttl));
    cookies.add(session_cookie(
        REFRESH_TOKEN,
        refresh,
        config.auth().refresh_token_ttl(),
    ));

    Ok(SessionResponse { user, access_token })
}

async fn issue_session(
    state: &AppState,
    cookies: &Cookies,
    user: UserEntity,
) -> WebResult<SessionResponse> {
    let ttl = Config::get_or_init(false).await.auth().refresh_token_ttl();
    let refresh = RefreshToken::issue(state.pool(), &user.as_actor(), user.id(), ttl)
        .await
        .map_err(db_err::<RefreshToken>)?;
    start_session(cookies, user, refresh).await
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterBody,
    description = "Creates a student or instructor account and signs it in",
    responses(
        (status = 200, description = "User created successfully", body = SessionResponse),
        (status = 400, description = "Invalid body or role", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    payload.validate()?;

    let role = match payload.role.as_deref() {
        None => UserRole::Student,
        Some(role) => match UserRole::parse(role) {
            Some(role @ (UserRole::Student | UserRole::Instructor)) => role,
            _ => return Err(WebError::registration_role_not_allowed()),
        },
    };

    let system = AuthenticatedUser::admin();
    let existing = UserEntity::find_by_email(state.pool(), &system, &payload.email)
        .await
        .map_err(db_err::<UserEntity>)?;
    if existing.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let data = UserEntityCreateUpdate {
        email: payload.email,
        password_hash: hash,
        full_name: payload.full_name,
        role,
    };

    let created = UserEntity::create(state.pool(), &system, data)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                WebError::registration_conflict()
            } else {
                db_err::<UserEntity>(e)
            }
        })?;

    tracing::info!("registered {} as {}", created.id(), created.role());
    let session = issue_session(&state, &cookies, created).await?;
    Ok((StatusCode::OK, Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    description = "Authorizes user in the system",
    request_body = LoginBody,
    responses(
        (status = 200, description = "User signed in", body = SessionResponse),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
)]
pub async fn login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginBody>,
) -> WebResult<impl IntoResponse> {
    payload.validate()?;

    let system = AuthenticatedUser::admin();
    let Some(user) = UserEntity::find_by_email(state.pool(), &system, &payload.email)
        .await
        .map_err(db_err::<UserEntity>)?
    else {
        return Err(WebError::auth_invalid_credentials());
    };

    let is_verified =
        verify_password(user.hash(), &payload.password).map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let session = issue_session(&state, &cookies, user).await?;
    Ok((StatusCode::OK, Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    description = "Exchanges the refresh cookie for a new token pair. Presenting an already \
        rotated token revokes every session of its owner",
    responses(
        (status = 200, description = "Tokens rotated", body = SessionResponse),
        (status = 401, description = "Refresh token missing, invalid, expired or reused", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<impl IntoResponse> {
    let Some(presented) = cookies
        .get(REFRESH_TOKEN)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Err(WebError::auth_cookie_not_found(REFRESH_TOKEN));
    };

    let system = AuthenticatedUser::admin();
    let ttl = Config::get_or_init(false).await.auth().refresh_token_ttl();
    let rotation = RefreshToken::rotate(state.pool(), &system, &presented, ttl)
        .await
        .map_err(db_err::<RefreshToken>)?;

    match rotation {
        Rotation::Rotated { user_id, token } => {
            let user = UserEntity::find_by_id(state.pool(), &system, user_id)
                .await
                .map_err(db_err::<UserEntity>)?;
            let Some(user) = user else {
                clear_session(&cookies);
                return Err(WebError::auth_refresh_invalid());
            };
            let session = start_session(&cookies, user, token).await?;
            Ok((StatusCode::OK, Json(session)))
        }
        Rotation::Reused { .. } => {
            clear_session(&cookies);
            Err(WebError::auth_refresh_reused())
        }
        Rotation::Invalid => {
            clear_session(&cookies);
            Err(WebError::auth_refresh_invalid())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    description = "Revokes the presented refresh token and clears auth cookies",
    responses(
        (status = 200, description = "Signed out"),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<impl IntoResponse> {
    if let Some(token) = cookies.get(REFRESH_TOKEN).map(|c| c.value().to_string()) {
        RefreshToken::revoke(state.pool(), &AuthenticatedUser::admin(), &token)
            .await
            .map_err(db_err::<RefreshToken>)?;
    }
    clear_session(&cookies);
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout-all",
    description = "Revokes every refresh token of the caller",
    responses(
        (status = 200, description = "All sessions revoked"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn logout_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let revoked = RefreshToken::revoke_all_for_user(state.pool(), user, user.user_id())
        .await
        .map_err(db_err::<RefreshToken>)?;
    clear_session(&cookies);
    Ok((StatusCode::OK, Json(json!({ "revoked": revoked }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password/forgot",
    request_body = ForgotPasswordBody,
    description = "Mails a password reset token. Answers the same whether the account exists or not",
    responses(
        (status = 200, description = "Request accepted"),
        (status = 400, description = "Invalid email", body = ErrorResponse),
    ),
    tag = "auth",
)]
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordBody>,
) -> WebResult<impl IntoResponse> {
    payload.validate()?;

    let system = AuthenticatedUser::admin();
    let user = UserEntity::find_by_email(state.pool(), &system, &payload.email)
        .await
        .map_err(db_err::<UserEntity>)?;

    if let Some(user) = user {
        let ttl = Config::get_or_init(false).await.auth().reset_token_ttl();
        let token = PasswordResetToken::issue(state.pool(), &system, user.id(), ttl)
            .await
            .map_err(db_err::<PasswordResetToken>)?;
        state.mailer().send_password_reset(user.email(), &token).await;
    } else {
        tracing::debug!("password reset for unknown email");
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "If the account exists, a reset link has been sent." })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password/reset",
    request_body = ResetPasswordBody,
    description = "Sets a new password with a reset token and signs out every session",
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Token invalid, used or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
)]
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordBody>,
) -> WebResult<impl IntoResponse> {
    payload.validate()?;

    let system = AuthenticatedUser::admin();
    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let Some(user_id) = PasswordResetToken::redeem(state.pool(), &system, &payload.token, &hash)
        .await
        .map_err(db_err::<PasswordResetToken>)?
    else {
        return Err(WebError::auth_reset_token_invalid());
    };

    tracing::info!("password reset for {}", user_id);
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password/change",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "New password too short", body = ErrorResponse),
        (status = 401, description = "Not signed in or current password wrong", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn change_password_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let mut entity = found(UserEntity::find_by_id(state.pool(), user, user.user_id()).await)?;
    let is_verified = verify_password(entity.hash(), &payload.current_password)
        .map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let hash = hash_password(&payload.new_password).map_err(WebError::server_crypt_error)?;
    entity
        .set_password(state.pool(), user, hash)
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user with its profile", body = UserWithProfile),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let entity = found(UserEntity::find_by_id(state.pool(), user, user.user_id()).await)?;
    let profile = UserProfile::find(state.pool(), entity.id(), &entity.role())
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok((StatusCode::OK, Json(UserWithProfile { user: entity, profile })))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cookies_are_http_only_lax() {
        let cookie = session_cookie(AUTH_TOKEN, "t".into(), chrono::Duration::minutes(15));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(15)));
    }
}
