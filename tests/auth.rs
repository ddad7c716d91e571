mod common;
use axum::http::StatusCode;
use serde_json::json;
use syllabus::model::entity::RefreshToken;
use syllabus::web::middlewares::{AUTH_TOKEN, REFRESH_TOKEN};
use syllabus::web::{AuthenticatedUser, UserRole};
use tower_cookies::cookie::SameSite;

use crate::common::{
    Action, Flow, login_action, register_action, seed_user, setup_server,
    setup_server_with_outbox, setup_test_db,
};

#[tokio::test]
async fn route_register_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("alice@example.com", "secret1", "student")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_cookie(REFRESH_TOKEN, |cookie| {
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    assert!(body.contains("alice@example.com"));
                    assert!(body.contains("access_token"));
                    assert!(!body.contains("password_hash"));
                }),
        )
        // emails are case-insensitive
        .step(
            register_action("ALICE@example.com", "secret1", "student")
                .with_expect(StatusCode::CONFLICT),
        )
        // admins cannot be registered from outside
        .step(
            register_action("mallory@example.com", "secret1", "admin")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            register_action("bob@example.com", "123", "student")
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("password"))),
        )
        .step(
            register_action("not-an-email", "secret1", "student")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_login_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("carol@example.com", "secret1", "instructor").with_save_cookies(false))
        .step(
            login_action("carol@example.com", "secret1")
                .with_clear_cookies(true)
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| assert!(body.contains("instructor")))
                .with_save_as("session"),
        )
        .step(
            Action::new("me", "GET", "/api/v1/auth/me")
                .assert_body(|body| {
                    assert!(body.contains("carol@example.com"));
                    assert!(body.contains("profile"));
                }),
        )
        // bearer header works without cookies
        .step(
            Action::new("me_bearer", "GET", "/api/v1/auth/me")
                .with_clear_cookies(true)
                .with_dyn_bearer(|ctx| {
                    ctx.get("session")["access_token"]
                        .as_str()
                        .unwrap()
                        .to_string()
                }),
        )
        .step(
            login_action("carol@example.com", "wrong-password")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("Authentication error"))),
        )
        .step(
            login_action("nobody@example.com", "secret1")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(Action::new("me_anonymous", "GET", "/api/v1/auth/me").with_expect(StatusCode::UNAUTHORIZED))
        // garbage tokens are rejected, not ignored
        .step(
            Action::new("me_garbage", "GET", "/api/v1/auth/me")
                .with_dyn_bearer(|_| "not.a.jwt".to_string())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_refresh_rotation_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("dave@example.com", "secret1", "student")
                .with_save_cookie_as(REFRESH_TOKEN, "first"),
        )
        .step(
            Action::new("refresh", "POST", "/api/v1/auth/refresh")
                .with_save_cookie_as(REFRESH_TOKEN, "second")
                .assert_body(|body| assert!(body.contains("access_token"))),
        )
        // presenting the rotated token again revokes the whole family
        .step(
            Action::new("refresh_reuse", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |ctx| {
                    ctx.get("first").as_str().unwrap().to_string()
                })
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("reuse"))),
        )
        .step(
            Action::new("refresh_after_reuse", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |ctx| {
                    ctx.get("second").as_str().unwrap().to_string()
                })
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("refresh_unknown", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |_| "made-up".to_string())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("refresh_missing", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_refresh_expired_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let mm = pool.model_manager();
    let grace = seed_user(&mm, "grace@example.com", UserRole::Student).await;
    let expired = RefreshToken::issue(
        &mm,
        &AuthenticatedUser::admin(),
        grace.id(),
        chrono::Duration::minutes(-1),
    )
    .await
    .unwrap();

    Flow::new()
        .step(
            Action::new("refresh_expired", "POST", "/api/v1/auth/refresh")
                .with_dyn_cookie(REFRESH_TOKEN, move |_| expired.clone())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // still usable credentials work as usual
        .step(login_action("grace@example.com", "secret1"))
        .step(Action::new("refresh", "POST", "/api/v1/auth/refresh"))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_logout_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("erin@example.com", "secret1", "student")
                .with_save_cookie_as(REFRESH_TOKEN, "rid"),
        )
        .step(Action::new("logout", "POST", "/api/v1/auth/logout"))
        .step(
            Action::new("refresh_after_logout", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |ctx| ctx.get("rid").as_str().unwrap().to_string())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // two sessions, logout-all kills both
        .step(login_action("erin@example.com", "secret1").with_clear_cookies(true))
        .step(
            login_action("erin@example.com", "secret1")
                .with_save_cookie_as(REFRESH_TOKEN, "other"),
        )
        .step(
            Action::new("logout_all", "POST", "/api/v1/auth/logout-all")
                .assert_body(|body| assert!(body.contains("\"revoked\":2"))),
        )
        .step(
            Action::new("refresh_other", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |ctx| ctx.get("other").as_str().unwrap().to_string())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("logout_all_anonymous", "POST", "/api/v1/auth/logout-all")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_password_reset_test() {
    let pool = setup_test_db().await;
    let (mut server, outbox) = setup_server_with_outbox(&pool).await;
    let mailbox = outbox.clone();

    Flow::new()
        .step(
            register_action("frank@example.com", "secret1", "student")
                .with_save_cookies(false)
                .with_save_cookie_as(REFRESH_TOKEN, "rid"),
        )
        // unknown accounts get the same answer and no mail
        .step(
            Action::new("forgot_unknown", "POST", "/api/v1/auth/password/forgot")
                .with_body(json!({ "email": "ghost@example.com" })),
        )
        .step(
            Action::new("forgot", "POST", "/api/v1/auth/password/forgot")
                .with_body(json!({ "email": "frank@example.com" })),
        )
        .step(
            Action::new("reset", "POST", "/api/v1/auth/password/reset").with_dyn_body(
                move |_| {
                    json!({
                        "token": mailbox.token_for("frank@example.com"),
                        "password": "brand-new",
                    })
                },
            ),
        )
        // a reset signs out every existing session
        .step(
            Action::new("refresh_after_reset", "POST", "/api/v1/auth/refresh")
                .with_clear_cookies(true)
                .with_dyn_cookie(REFRESH_TOKEN, |ctx| ctx.get("rid").as_str().unwrap().to_string())
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // tokens are single use
        .step({
            let mailbox = outbox.clone();
            Action::new("reset_again", "POST", "/api/v1/auth/password/reset")
                .with_dyn_body(move |_| {
                    json!({
                        "token": mailbox.token_for("frank@example.com"),
                        "password": "another-one",
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST)
        })
        .step(login_action("frank@example.com", "secret1").with_expect(StatusCode::UNAUTHORIZED))
        .step(login_action("frank@example.com", "brand-new"))
        .step(
            Action::new("change_wrong", "POST", "/api/v1/auth/password/change")
                .with_body(json!({ "current_password": "nope", "new_password": "changed1" }))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("change", "POST", "/api/v1/auth/password/change")
                .with_body(json!({ "current_password": "brand-new", "new_password": "changed1" })),
        )
        .step(login_action("frank@example.com", "changed1").with_clear_cookies(true))
        .run(&mut server, pool)
        .await;

    assert_eq!(outbox.count(), 1);
}
