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
        CrudRepository, ResourceTyped,
        entity::{Enrollment, Review, ReviewCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::ReviewBody,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, db_err, ensure_owner, found, visible_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/courses/{id}/reviews",
            get(review_list_handler).post(review_create_handler),
        )
        .route(
            "/reviews/{id}",
            put(review_update_handler).delete(review_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course id"), PaginationQuery),
    responses(
        (status = 200, description = "Reviews, newest first", body = crate::model::Page<Review>),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "reviews"
)]
pub async fn review_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> WebResult<impl IntoResponse> {
    visible_course(state.pool(), ctx.maybe_user(), course_id).await?;
    let (limit, offset) = page.bounds();

    let reviews =
        Review::page_by_course(state.pool(), &AuthenticatedUser::admin(), course_id, limit, offset)
            .await
            .map_err(db_err::<Review>)?;

    Ok((StatusCode::OK, Json(reviews)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = ReviewBody,
    description = "One review per student and course. Requires an active or completed enrollment",
    responses(
        (status = 200, description = "Review created", body = Review),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already reviewed", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn review_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ReviewBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let course = visible_course(state.pool(), Some(user), course_id).await?;
    let enrolled = Enrollment::grants_access_to(state.pool(), user, user.user_id(), course.id())
        .await
        .map_err(db_err::<Review>)?;
    if !enrolled {
        return Err(WebError::resource_forbidden(Review::get_resource_type()));
    }

    let data = ReviewCreate {
        course_id,
        student_id: user.user_id(),
        rating: payload.rating,
        comment: payload.comment,
    };
    let created = Review::create(state.pool(), user, data)
        .await
        .map_err(db_err::<Review>)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Only the author", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn review_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let review = found(Review::find_by_id(state.pool(), user, id).await)?;
    // admins may remove reviews but never rewrite them
    if review.student_id() != user.user_id() {
        return Err(WebError::resource_forbidden(Review::get_resource_type()));
    }

    let data = ReviewCreate {
        course_id: review.course_id(),
        student_id: review.student_id(),
        rating: payload.rating,
        comment: payload.comment,
    };
    let updated = review
        .update(state.pool(), user, data)
        .await
        .map_err(db_err::<Review>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Only the author or an admin", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
    ),
    tag = "reviews",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn review_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let review = found(Review::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &review).await?;

    review
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<Review>)?;

    Ok(StatusCode::OK)
}
