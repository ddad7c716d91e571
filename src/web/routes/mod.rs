use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    Config,
    model::{
        CrudRepository, DatabaseError, DatabaseResult, HasOwner, ModelManager, ResourceTyped,
        check_access,
        entity::{Course, Enrollment},
    },
    web::{AppState, AuthenticatedUser, WebError, WebResult, doc::ApiDoc},
};

pub mod auth;
pub mod courses;
pub mod curricula;
pub mod enrollments;
pub mod lessons;
pub mod quizzes;
pub mod reviews;
pub mod users;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl PaginationQuery {
    /// `(limit, offset)` clamped to sane bounds.
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE_SIZE), self.offset.max(0))
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let api = Router::new()
        .merge(auth::routes(state.clone()))
        .merge(users::routes(state.clone()))
        .merge(courses::routes(state.clone()))
        .merge(curricula::routes(state.clone()))
        .merge(lessons::routes(state.clone()))
        .merge(quizzes::routes(state.clone()))
        .merge(enrollments::routes(state.clone()))
        .merge(reviews::routes(state.clone()));

    let mut router = Router::new()
        .nest("/api/v1", api)
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive());

    if config.app().docs() {
        router = router
            .merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", ApiDoc::openapi()));
    }

    router
}

// Handler helpers

pub(crate) fn db_err<T: ResourceTyped>(e: DatabaseError) -> WebError {
    WebError::from_database(T::get_resource_type(), e)
}

/// Unwraps a lookup, missing rows become 404.
pub(crate) fn found<T: ResourceTyped>(result: DatabaseResult<Option<T>>) -> WebResult<T> {
    match result {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(WebError::resource_not_found(T::get_resource_type())),
        Err(e) => Err(db_err::<T>(e)),
    }
}

/// Ownership check for the caller, 403 when it fails.
pub(crate) async fn ensure_owner<T>(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    resource: &T,
) -> WebResult<()>
where
    T: HasOwner<OwnerId = Uuid> + ResourceTyped + Sync,
{
    check_access(mm, user, resource, user.user_id())
        .await
        .map_err(db_err::<T>)
}

/// Loads a course, hiding drafts from everybody but the owner and admins.
pub(crate) async fn visible_course(
    mm: &ModelManager,
    user: Option<&AuthenticatedUser>,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = found(Course::find_by_id(mm, &AuthenticatedUser::admin(), course_id).await)?;
    if !course.is_visible_to(user) {
        return Err(WebError::resource_not_found(Course::get_resource_type()));
    }
    Ok(course)
}

/// Owner, admin or a student whose enrollment grants access.
pub(crate) async fn can_study(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    course: &Course,
) -> WebResult<bool> {
    if user.is_admin() || user.user_id() == course.instructor_id() {
        return Ok(true);
    }
    Enrollment::grants_access_to(mm, user, user.user_id(), course.id())
        .await
        .map_err(db_err::<Enrollment>)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let q: PaginationQuery = serde_json::from_str(r#"{"limit": 5000, "offset": -3}"#).unwrap();
        assert_eq!(q.bounds(), (MAX_PAGE_SIZE, 0));
        assert_eq!(PaginationQuery::default().bounds(), (20, 0));
    }
}
