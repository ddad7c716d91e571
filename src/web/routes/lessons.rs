use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Curriculum, Lesson},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{LessonBody, LessonSummary},
        error::ErrorResponse,
        middlewares,
        routes::{can_study, db_err, ensure_owner, found, visible_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/curricula/{id}/lessons",
            get(lesson_list_handler).post(lesson_create_handler),
        )
        .route(
            "/lessons/{id}",
            get(lesson_get_handler)
                .put(lesson_update_handler)
                .delete(lesson_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/curricula/{id}/lessons",
    params(("id" = Uuid, Path, description = "Curriculum id")),
    description = "Lesson summaries (no content) ordered by position",
    responses(
        (status = 200, description = "Lessons of the curriculum", body = Vec<LessonSummary>),
        (status = 404, description = "Curriculum not found", body = ErrorResponse),
    ),
    tag = "lessons"
)]
pub async fn lesson_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(curriculum_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let system = AuthenticatedUser::admin();
    let curriculum = found(Curriculum::find_by_id(state.pool(), &system, curriculum_id).await)?;
    visible_course(state.pool(), ctx.maybe_user(), curriculum.course_id()).await?;

    let lessons = Lesson::all_by_curriculum(state.pool(), &system, curriculum_id)
        .await
        .map_err(db_err::<Lesson>)?;
    let summaries: Vec<LessonSummary> = lessons.iter().map(LessonSummary::from).collect();

    Ok((StatusCode::OK, Json(summaries)))
}

#[utoipa::path(
    post,
    path = "/api/v1/curricula/{id}/lessons",
    params(("id" = Uuid, Path, description = "Curriculum id")),
    request_body = LessonBody,
    responses(
        (status = 200, description = "Lesson created", body = Lesson),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn lesson_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(curriculum_id): Path<Uuid>,
    Json(payload): Json<LessonBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let curriculum = found(Curriculum::find_by_id(state.pool(), user, curriculum_id).await)?;
    ensure_owner(state.pool(), user, &curriculum).await?;

    let created = Lesson::create(state.pool(), user, payload.into_create(curriculum_id))
        .await
        .map_err(db_err::<Lesson>)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Full lesson. Previews are public, other lessons need an active or completed \
        enrollment, or ownership of the course",
    responses(
        (status = 200, description = "Lesson", body = Lesson),
        (status = 401, description = "Sign in to see this lesson", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons"
)]
pub async fn lesson_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let system = AuthenticatedUser::admin();
    let lesson = found(Lesson::find_by_id(state.pool(), &system, id).await)?;
    let course_id = lesson.course_id(state.pool()).await.map_err(db_err::<Lesson>)?;
    let course = visible_course(state.pool(), ctx.maybe_user(), course_id).await?;

    if !lesson.is_preview() {
        let user = ctx.user()?;
        if !can_study(state.pool(), user, &course).await? {
            return Err(WebError::resource_forbidden(Lesson::get_resource_type()));
        }
    }

    Ok((StatusCode::OK, Json(lesson)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    request_body = LessonBody,
    description = "Updates the lesson. A `position` moves it within its curriculum",
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn lesson_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let lesson = found(Lesson::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &lesson).await?;

    let curriculum_id = lesson.curriculum_id();
    let updated = lesson
        .update(state.pool(), user, payload.into_create(curriculum_id))
        .await
        .map_err(db_err::<Lesson>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn lesson_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = found(Lesson::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &lesson).await?;

    lesson
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<Lesson>)?;

    Ok(StatusCode::OK)
}
