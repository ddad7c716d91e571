use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct AuthModifier;

impl Modify for AuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT access token for current user",
                ))),
            );
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::auth::register_handler,
        crate::web::routes::auth::login_handler,
        crate::web::routes::auth::refresh_handler,
        crate::web::routes::auth::logout_handler,
        crate::web::routes::auth::logout_all_handler,
        crate::web::routes::auth::forgot_password_handler,
        crate::web::routes::auth::reset_password_handler,
        crate::web::routes::auth::change_password_handler,
        crate::web::routes::auth::me_handler,
        crate::web::routes::courses::course_list_handler,
        crate::web::routes::courses::course_mine_handler,
        crate::web::routes::courses::course_get_handler,
        crate::web::routes::courses::course_create_handler,
        crate::web::routes::courses::course_update_handler,
        crate::web::routes::courses::course_delete_handler,
        crate::web::routes::curricula::curriculum_list_handler,
        crate::web::routes::curricula::curriculum_create_handler,
        crate::web::routes::curricula::curriculum_update_handler,
        crate::web::routes::curricula::curriculum_delete_handler,
        crate::web::routes::enrollments::enroll_handler,
        crate::web::routes::enrollments::my_enrollments_handler,
        crate::web::routes::enrollments::course_enrollments_handler,
        crate::web::routes::enrollments::enrollment_status_handler,
        crate::web::routes::enrollments::enrollment_cancel_handler,
        crate::web::routes::lessons::lesson_list_handler,
        crate::web::routes::lessons::lesson_create_handler,
        crate::web::routes::lessons::lesson_get_handler,
        crate::web::routes::lessons::lesson_update_handler,
        crate::web::routes::lessons::lesson_delete_handler,
        crate::web::routes::quizzes::quiz_create_handler,
        crate::web::routes::quizzes::quiz_get_handler,
        crate::web::routes::quizzes::quiz_update_handler,
        crate::web::routes::quizzes::quiz_delete_handler,
        crate::web::routes::quizzes::question_create_handler,
        crate::web::routes::quizzes::question_update_handler,
        crate::web::routes::quizzes::question_delete_handler,
        crate::web::routes::quizzes::attempt_submit_handler,
        crate::web::routes::quizzes::attempt_list_handler,
        crate::web::routes::reviews::review_list_handler,
        crate::web::routes::reviews::review_create_handler,
        crate::web::routes::reviews::review_update_handler,
        crate::web::routes::reviews::review_delete_handler,
        crate::web::routes::users::user_list_handler,
        crate::web::routes::users::user_get_handler,
        crate::web::routes::users::user_update_me_handler,
        crate::web::routes::users::user_role_handler,
        crate::web::routes::users::user_delete_handler,
    ),
    tags(
        (name = "auth", description = "Registration, sessions and passwords"),
        (name = "users", description = "Accounts and profiles"),
        (name = "courses", description = "Course catalogue"),
        (name = "curricula", description = "Course sections"),
        (name = "lessons", description = "Lesson content"),
        (name = "quizzes", description = "Quizzes, questions and attempts"),
        (name = "enrollments", description = "Student enrollments"),
        (name = "reviews", description = "Course reviews"),
    ),
    modifiers(&AuthModifier),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_every_tag() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/courses/{id}",
            "/api/v1/quizzes/{id}/attempts",
            "/api/v1/courses/{id}/enroll",
            "/api/v1/reviews/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("cookie"));
        assert!(schemes.contains_key("bearer"));
    }
}
