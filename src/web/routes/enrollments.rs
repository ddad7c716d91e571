use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ModelManager, ResourceTyped,
        entity::{Course, Enrollment, EnrollmentStatus},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::StatusBody,
        error::ErrorResponse,
        middlewares,
        routes::{db_err, ensure_owner, found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/courses/{id}/enroll", post(enroll_handler))
        .route("/courses/{id}/enrollments", get(course_enrollments_handler))
        .route("/enrollments/me", get(my_enrollments_handler))
        .route("/enrollments/{id}/status", put(enrollment_status_handler))
        .route("/enrollments/{id}", delete(enrollment_cancel_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn enrollment_course(mm: &ModelManager, enrollment: &Enrollment) -> WebResult<Course> {
    found(Course::find_by_id(mm, &AuthenticatedUser::admin(), enrollment.course_id()).await)
}

fn invalid_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> WebError {
    WebError::resource_bad_request(
        Enrollment::get_resource_type(),
        format!("cannot move enrollment from {from} to {to}"),
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Enrolls the caller. Free courses start active, paid ones pending. \
        A cancelled enrollment is reopened",
    responses(
        (status = 200, description = "Enrollment", body = Enrollment),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Students only", body = ErrorResponse),
        (status = 404, description = "Course not found or not published", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user_with_role(&[UserRole::Student])?;

    let course = found(Course::find_by_id(state.pool(), user, course_id).await)?;
    if !course.is_published() {
        return Err(WebError::resource_not_found(Course::get_resource_type()));
    }

    let initial = if course.is_free() {
        EnrollmentStatus::Active
    } else {
        EnrollmentStatus::Pending
    };

    let existing = Enrollment::find_for(state.pool(), user, user.user_id(), course_id)
        .await
        .map_err(db_err::<Enrollment>)?;

    let enrollment = match existing {
        Some(enrollment) if enrollment.status() == EnrollmentStatus::Cancelled => enrollment
            .set_status(state.pool(), user, initial)
            .await
            .map_err(db_err::<Enrollment>)?,
        Some(_) => {
            return Err(WebError::resource_conflict(Enrollment::get_resource_type()));
        }
        None => Enrollment::create(state.pool(), user, user.user_id(), course_id, initial)
            .await
            .map_err(db_err::<Enrollment>)?,
    };

    tracing::info!(
        "{} enrolled in {} as {}",
        user.user_id(),
        course_id,
        enrollment.status()
    );
    Ok((StatusCode::OK, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/me",
    responses(
        (status = 200, description = "Enrollments of the caller, newest first", body = Vec<Enrollment>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn my_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = Enrollment::all_by_student(state.pool(), user, user.user_id())
        .await
        .map_err(db_err::<Enrollment>)?;

    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrollments of the course", body = Vec<Enrollment>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn course_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = found(Course::find_by_id(state.pool(), user, course_id).await)?;
    ensure_owner(state.pool(), user, &course).await?;

    let enrollments = Enrollment::all_by_course(state.pool(), user, course_id)
        .await
        .map_err(db_err::<Enrollment>)?;

    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    put,
    path = "/api/v1/enrollments/{id}/status",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    request_body = StatusBody,
    description = "Moves an enrollment along pending -> active -> completed. \
        Anything can be cancelled, cancelled can be reopened",
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn enrollment_status_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = found(Enrollment::find_by_id(state.pool(), user, id).await)?;
    let course = enrollment_course(state.pool(), &enrollment).await?;
    ensure_owner(state.pool(), user, &course).await?;

    let current = enrollment.status();
    if !current.can_transition_to(payload.status) {
        return Err(invalid_transition(current, payload.status));
    }

    let updated = enrollment
        .set_status(state.pool(), user, payload.status)
        .await
        .map_err(db_err::<Enrollment>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    description = "Cancels the enrollment. The row is kept so it can be reopened",
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 400, description = "Completed enrollments cannot be cancelled", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not your enrollment", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn enrollment_cancel_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = found(Enrollment::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &enrollment).await?;

    let current = enrollment.status();
    if current == EnrollmentStatus::Cancelled {
        return Ok((StatusCode::OK, Json(enrollment)));
    }
    if !current.can_transition_to(EnrollmentStatus::Cancelled) {
        return Err(invalid_transition(current, EnrollmentStatus::Cancelled));
    }

    let cancelled = enrollment
        .set_status(state.pool(), user, EnrollmentStatus::Cancelled)
        .await
        .map_err(db_err::<Enrollment>)?;

    Ok((StatusCode::OK, Json(cancelled)))
}
