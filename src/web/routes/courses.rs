use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, PaginatableRepository,
        entity::{Course, Curriculum, Lesson, Quiz},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebResult,
        dto::{CourseBody, CourseOutline},
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, db_err, ensure_owner, found, visible_course},
    },
};

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    /// Case-insensitive match on title or description
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl CourseListQuery {
    fn page(&self) -> PaginationQuery {
        let default = PaginationQuery::default();
        PaginationQuery {
            limit: self.limit.unwrap_or(default.limit),
            offset: self.offset.unwrap_or(default.offset),
        }
    }
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/courses",
            get(course_list_handler).post(course_create_handler),
        )
        .route("/courses/mine", get(course_mine_handler))
        .route(
            "/courses/{id}",
            get(course_get_handler)
                .put(course_update_handler)
                .delete(course_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CourseListQuery),
    description = "Published catalogue, newest first",
    responses(
        (status = 200, description = "Requested page", body = crate::model::Page<Course>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn course_list_handler(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> WebResult<impl IntoResponse> {
    let system = AuthenticatedUser::admin();
    let (limit, offset) = query.page().bounds();

    let page = match query.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => {
            Course::search(state.pool(), &system, term, limit, offset).await
        }
        _ => Course::page(state.pool(), &system, limit, offset).await,
    }
    .map_err(db_err::<Course>)?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/mine",
    description = "Courses of the caller, drafts included",
    responses(
        (status = 200, description = "Own courses", body = Vec<Course>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Instructors and admins only", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn course_mine_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = author(&ctx)?;
    let courses = Course::all_by_instructor(state.pool(), user, user.user_id())
        .await
        .map_err(db_err::<Course>)?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Course with its curricula, lesson summaries and quizzes",
    responses(
        (status = 200, description = "Course outline", body = CourseOutline),
        (status = 404, description = "Course not found or not published", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn course_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let course = visible_course(state.pool(), ctx.maybe_user(), id).await?;

    let system = AuthenticatedUser::admin();
    let curricula = Curriculum::all_by_course(state.pool(), &system, id)
        .await
        .map_err(db_err::<Curriculum>)?;
    let lessons = Lesson::all_by_course(state.pool(), &system, id)
        .await
        .map_err(db_err::<Lesson>)?;
    let quizzes = Quiz::all_by_course(state.pool(), &system, id)
        .await
        .map_err(db_err::<Quiz>)?;

    let outline = CourseOutline::assemble(course, curricula, &lessons, &quizzes);
    Ok((StatusCode::OK, Json(outline)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseBody,
    responses(
        (status = 200, description = "Course created", body = Course),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Instructors and admins only", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn course_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = author(&ctx)?;
    payload.validate()?;

    let created = Course::create(state.pool(), user, payload.into_create(user.user_id()))
        .await
        .map_err(db_err::<Course>)?;

    tracing::info!("course {} created by {}", created.id(), user.user_id());
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseBody,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let course = found(Course::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &course).await?;

    let instructor_id = course.instructor_id();
    let updated = course
        .update(state.pool(), user, payload.into_create(instructor_id))
        .await
        .map_err(db_err::<Course>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Deletes the course with everything that hangs off it",
    responses(
        (status = 200, description = "Course deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn course_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = found(Course::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &course).await?;

    course
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<Course>)?;

    Ok(StatusCode::OK)
}

fn author(ctx: &RequestContext) -> WebResult<&AuthenticatedUser> {
    ctx.user_with_role(&[UserRole::Instructor, UserRole::Admin])
}
