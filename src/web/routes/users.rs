use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate, UserProfile},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        dto::{RoleBody, UpdateMeBody, UserWithProfile},
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, db_err, ensure_owner, found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/users/page", get(user_list_handler))
        .route("/users/me", put(user_update_me_handler))
        .route(
            "/users/{id}",
            get(user_get_handler).delete(user_delete_handler),
        )
        .route("/users/{id}/role", put(user_role_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn user_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user_with_role(&[UserRole::Admin])?;
    let (limit, offset) = page.bounds();

    let users = UserEntity::page(state.pool(), user, limit, offset)
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok((StatusCode::OK, Json(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User with its profile", body = UserWithProfile),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Only the user itself or an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn user_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let target = found(UserEntity::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &target).await?;

    let profile = UserProfile::find(state.pool(), target.id(), &target.role())
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok((StatusCode::OK, Json(UserWithProfile { user: target, profile })))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateMeBody,
    responses(
        (status = 200, description = "Updated user and profile", body = UserWithProfile),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn user_update_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMeBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let mut entity = found(UserEntity::find_by_id(state.pool(), user, user.user_id()).await)?;
    if let Some(full_name) = payload.full_name.clone() {
        let data = UserEntityCreateUpdate {
            email: entity.email().to_string(),
            password_hash: String::new(), // not in use
            full_name,
            role: entity.role(),
        };
        entity = entity
            .update(state.pool(), user, data)
            .await
            .map_err(db_err::<UserEntity>)?;
    }

    let profile = UserProfile::update(state.pool(), entity.id(), &entity.role(), payload.profile())
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok((StatusCode::OK, Json(UserWithProfile { user: entity, profile })))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleBody,
    responses(
        (status = 200, description = "Role changed", body = UserEntity),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn user_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user_with_role(&[UserRole::Admin])?;
    let Some(role) = UserRole::parse(&payload.role) else {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            "unknown role",
        ));
    };

    let target = found(UserEntity::find_by_id(state.pool(), user, id).await)?;
    let updated = target
        .set_role(state.pool(), user, role)
        .await
        .map_err(db_err::<UserEntity>)?;

    tracing::info!("{} changed role of {} to {}", user.user_id(), id, role);
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    description = "Deletes specified user",
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let target = found(UserEntity::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &target).await?;

    target
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<UserEntity>)?;

    Ok(StatusCode::OK)
}
