use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, HasOwner, ModelManager, ResourceTyped,
        entity::{Course, Curriculum, Enrollment, Question, Quiz, QuizAttempt, grade},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{AttemptBody, AttemptResponse, QuestionBody, QuestionView, QuizBody, QuizDetail},
        error::ErrorResponse,
        middlewares,
        routes::{can_study, db_err, ensure_owner, found, visible_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/curricula/{id}/quizzes", post(quiz_create_handler))
        .route(
            "/quizzes/{id}",
            get(quiz_get_handler)
                .put(quiz_update_handler)
                .delete(quiz_delete_handler),
        )
        .route("/quizzes/{id}/questions", post(question_create_handler))
        .route(
            "/questions/{id}",
            put(question_update_handler).delete(question_delete_handler),
        )
        .route(
            "/quizzes/{id}/attempts",
            get(attempt_list_handler).post(attempt_submit_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Course of `quiz`, 404 while it is a draft the caller does not own.
async fn quiz_course(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    quiz: &Quiz,
) -> WebResult<Course> {
    let course_id = quiz.course_id(mm).await.map_err(db_err::<Quiz>)?;
    visible_course(mm, Some(user), course_id).await
}

async fn is_owner(mm: &ModelManager, user: &AuthenticatedUser, quiz: &Quiz) -> WebResult<bool> {
    if user.is_admin() {
        return Ok(true);
    }
    let owner = quiz.get_owner_id(mm, user).await.map_err(db_err::<Quiz>)?;
    Ok(owner == user.user_id())
}

#[utoipa::path(
    post,
    path = "/api/v1/curricula/{id}/quizzes",
    params(("id" = Uuid, Path, description = "Curriculum id")),
    request_body = QuizBody,
    responses(
        (status = 200, description = "Quiz created", body = Quiz),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Curriculum not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn quiz_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(curriculum_id): Path<Uuid>,
    Json(payload): Json<QuizBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let curriculum = found(Curriculum::find_by_id(state.pool(), user, curriculum_id).await)?;
    ensure_owner(state.pool(), user, &curriculum).await?;

    let created = Quiz::create(state.pool(), user, payload.into_create(curriculum_id))
        .await
        .map_err(db_err::<Quiz>)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz id")),
    description = "Quiz with its questions. Correct answers are only included for the course \
        owner and admins",
    responses(
        (status = 200, description = "Quiz", body = QuizDetail),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Quiz not found or course unpublished", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn quiz_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = found(Quiz::find_by_id(state.pool(), user, id).await)?;
    let course = quiz_course(state.pool(), user, &quiz).await?;

    let reveal = is_owner(state.pool(), user, &quiz).await?;
    if !reveal && !can_study(state.pool(), user, &course).await? {
        return Err(WebError::resource_forbidden(Quiz::get_resource_type()));
    }

    let questions = Question::all_by_quiz(state.pool(), user, id)
        .await
        .map_err(db_err::<Question>)?
        .iter()
        .map(|q| QuestionView::new(q, reveal))
        .collect();

    Ok((StatusCode::OK, Json(QuizDetail { quiz, questions })))
}

#[utoipa::path(
    put,
    path = "/api/v1/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz id")),
    request_body = QuizBody,
    responses(
        (status = 200, description = "Quiz updated", body = Quiz),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn quiz_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let quiz = found(Quiz::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &quiz).await?;

    let curriculum_id = quiz.curriculum_id();
    let updated = quiz
        .update(state.pool(), user, payload.into_create(curriculum_id))
        .await
        .map_err(db_err::<Quiz>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn quiz_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = found(Quiz::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &quiz).await?;

    quiz.delete(state.pool(), user)
        .await
        .map_err(db_err::<Quiz>)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{id}/questions",
    params(("id" = Uuid, Path, description = "Quiz id")),
    request_body = QuestionBody,
    description = "Appends a single choice question to the quiz",
    responses(
        (status = 200, description = "Question created", body = Question),
        (status = 400, description = "Invalid body or correct_option out of range", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn question_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<QuestionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let quiz = found(Quiz::find_by_id(state.pool(), user, quiz_id).await)?;
    ensure_owner(state.pool(), user, &quiz).await?;

    let data = payload.into_create(quiz_id);
    if !data.has_valid_answer() {
        return Err(WebError::resource_bad_request(
            Question::get_resource_type(),
            "correct_option must index into options",
        ));
    }

    let created = Question::create(state.pool(), user, data)
        .await
        .map_err(db_err::<Question>)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = QuestionBody,
    responses(
        (status = 200, description = "Question updated", body = Question),
        (status = 400, description = "Invalid body or correct_option out of range", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn question_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate()?;

    let question = found(Question::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &question).await?;

    let data = payload.into_create(question.quiz_id());
    if !data.has_valid_answer() {
        return Err(WebError::resource_bad_request(
            Question::get_resource_type(),
            "correct_option must index into options",
        ));
    }

    let updated = question
        .update(state.pool(), user, data)
        .await
        .map_err(db_err::<Question>)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not the course owner", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn question_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let question = found(Question::find_by_id(state.pool(), user, id).await)?;
    ensure_owner(state.pool(), user, &question).await?;

    question
        .delete(state.pool(), user)
        .await
        .map_err(db_err::<Question>)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{id}/attempts",
    params(("id" = Uuid, Path, description = "Quiz id")),
    request_body = AttemptBody,
    description = "Grades and stores an attempt. Each correct answer earns the question's points",
    responses(
        (status = 200, description = "Graded attempt", body = AttemptResponse),
        (status = 400, description = "Quiz has no questions", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn attempt_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<AttemptBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = found(Quiz::find_by_id(state.pool(), user, quiz_id).await)?;
    let course = quiz_course(state.pool(), user, &quiz).await?;

    let enrolled = Enrollment::grants_access_to(state.pool(), user, user.user_id(), course.id())
        .await
        .map_err(db_err::<QuizAttempt>)?;
    if !enrolled {
        return Err(WebError::resource_forbidden(QuizAttempt::get_resource_type()));
    }

    let questions = Question::all_by_quiz(state.pool(), user, quiz_id)
        .await
        .map_err(db_err::<Question>)?;
    if questions.is_empty() {
        return Err(WebError::resource_bad_request(
            Quiz::get_resource_type(),
            "quiz has no questions",
        ));
    }

    let graded = grade(&questions, &payload.answers, quiz.pass_percent());
    let (attempt, answers) =
        QuizAttempt::record(state.pool(), user, quiz_id, user.user_id(), &graded)
            .await
            .map_err(db_err::<QuizAttempt>)?;

    tracing::info!(
        "attempt {} on quiz {}: {}/{}",
        attempt.id(),
        quiz_id,
        graded.score,
        graded.max_score
    );

    Ok((StatusCode::OK, Json(AttemptResponse { attempt, answers })))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}/attempts",
    params(("id" = Uuid, Path, description = "Quiz id")),
    description = "Students get their own attempts, the course owner and admins get all of them",
    responses(
        (status = 200, description = "Attempts, newest first", body = Vec<QuizAttempt>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
pub async fn attempt_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = found(Quiz::find_by_id(state.pool(), user, quiz_id).await)?;

    let student = if is_owner(state.pool(), user, &quiz).await? {
        None
    } else {
        Some(user.user_id())
    };

    let attempts = QuizAttempt::all_by_quiz(state.pool(), user, quiz_id, student)
        .await
        .map_err(db_err::<QuizAttempt>)?;

    Ok((StatusCode::OK, Json(attempts)))
}
