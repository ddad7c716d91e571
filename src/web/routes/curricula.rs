use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository,
        entity::{Course, Curriculum},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebResult,
        dto::CurriculumBody,
        error::ErrorResponse,
        middlewares,
        routes::{db_err, ensure_owner, found, visible_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/courses/{id}/curricula",
            get(curriculum_list_handler).post(curriculum_create_handler),
        )
        .route(
            "/curricula/{id}",
            put(curriculum_update_handler).delete(curriculum_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/curricula",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Curricula ordered by position", body = Vec<Curriculum>),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "curricula"
)]
pub async fn curriculum_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    visible_course(state.pool(), ctx.maybe_user(), course_id).await?;

    let curricula = Curriculum::all_by_course(state.pool(), &AuthenticatedUser::admin(), course_id)
        .await
        .map_err(db_err::<Curriculum>)?;

    Ok((StatusCode::OK, Json(curricula)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/curricula",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CurriculumBody,
    description = "Inserts a curriculum at `position` (appends when absent), shifting later ones",
    responses(
        (status = 200, description = "Curriculum created", body = Curriculum),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "curricula",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn curriculum_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CurriculumBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let course = found(Course::find_by_id(state.pool(), user, course_id).await)?;
    ensure_owner(state.pool(), user, &course).await?;

    let created = Curriculum::create(state.pool(), user, payload.into_create(course_id))
        .await
        .map_err(db_err::<Curriculum>)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/curricula/{id}",
    params(("id" = Uuid, Path, description = "Curriculum id")),
    request_body = CurriculumBody,
    description = "Updates the curriculum. A `position` moves it and reorders its siblings",
    responses(
        (status = 200, description = "Curriculum updated", body = Curriculum),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse),
    ),
    tag = "curricula",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn curriculum_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CurriculumBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let curriculum = found(Curriculum::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &curriculum).await?;

    let course_id = curriculum.course_id();
    let updated = curriculum
        .update(state.pool(), user, payload.into_create(course_id))
        .await
        .map_err(db_err::<Curriculum>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/curricula/{id}",
    params(("id" = Uuid, Path, description = "Curriculum id")),
    description = "Deletes the curriculum with its lessons and quizzes and closes the position gap",
    responses(
        (status = 200, description = "Curriculum deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse),
    ),
    tag = "curricula",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn curriculum_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let curriculum = found(Curriculum::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &curriculum).await?;

    curriculum
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<Curriculum>)?;

    Ok(StatusCode::OK)
}
