mod common;
use chrono::Duration;
use syllabus::auth::{hash_password, hash_token, verify_password};
use syllabus::model::CrudRepository;
use syllabus::model::entity::{
    Course, CourseCreate, CourseLevel, PasswordResetToken, RefreshToken, Review, ReviewCreate,
    Rotation, UserEntity,
};
use syllabus::web::{AuthenticatedUser, UserRole};

use crate::common::{seed_user, setup_test_db};

#[tokio::test]
async fn concurrent_reviews_keep_rating_consistent() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let system = AuthenticatedUser::admin();

    let tutor = seed_user(&mm, "tutor@example.com", UserRole::Instructor).await;
    let alice = seed_user(&mm, "alice@example.com", UserRole::Student).await;
    let bob = seed_user(&mm, "bob@example.com", UserRole::Student).await;

    for round in 0..10 {
        let course = Course::create(
            &mm,
            &system,
            CourseCreate {
                instructor_id: tutor.id(),
                title: format!("Course {round}"),
                description: String::new(),
                level: CourseLevel::Beginner,
                price_cents: 0,
                thumbnail_url: None,
                is_published: true,
            },
        )
        .await
        .unwrap();

        let review = |student_id, rating| ReviewCreate {
            course_id: course.id(),
            student_id,
            rating,
            comment: String::new(),
        };
        let (a, b) = tokio::join!(
            Review::create(&mm, &system, review(alice.id(), 4)),
            Review::create(&mm, &system, review(bob.id(), 3)),
        );
        a.unwrap();
        b.unwrap();

        let course = Course::find_by_id(&mm, &system, course.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(course.review_count(), 2, "round {round}");
        assert_eq!(course.average_rating(), 3.5, "round {round}");
    }
}

#[tokio::test]
async fn password_reset_redeem_is_all_or_nothing() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let system = AuthenticatedUser::admin();

    let frank = seed_user(&mm, "frank@example.com", UserRole::Student).await;
    let session = RefreshToken::issue(&mm, &system, frank.id(), Duration::days(7))
        .await
        .unwrap();
    let reset = PasswordResetToken::issue(&mm, &system, frank.id(), Duration::minutes(60))
        .await
        .unwrap();
    let new_hash = hash_password("brand-new").unwrap();

    // an unknown token changes nothing
    let redeemed = PasswordResetToken::redeem(&mm, &system, "made-up", &new_hash)
        .await
        .unwrap();
    assert!(redeemed.is_none());
    let unchanged = UserEntity::find_by_id(&mm, &system, frank.id())
        .await
        .unwrap()
        .unwrap();
    assert!(verify_password(unchanged.hash(), "secret1").unwrap());

    let redeemed = PasswordResetToken::redeem(&mm, &system, &reset, &new_hash)
        .await
        .unwrap();
    assert_eq!(redeemed, Some(frank.id()));

    let changed = UserEntity::find_by_id(&mm, &system, frank.id())
        .await
        .unwrap()
        .unwrap();
    assert!(verify_password(changed.hash(), "brand-new").unwrap());

    // the old session was revoked together with the password change
    let rotation = RefreshToken::rotate(&mm, &system, &session, Duration::days(7))
        .await
        .unwrap();
    assert!(matches!(rotation, Rotation::Reused { .. }));

    let again = PasswordResetToken::redeem(&mm, &system, &reset, &new_hash)
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn expired_refresh_token_is_dropped() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let system = AuthenticatedUser::admin();

    let erin = seed_user(&mm, "erin@example.com", UserRole::Student).await;
    let expired = RefreshToken::issue(&mm, &system, erin.id(), Duration::minutes(-5))
        .await
        .unwrap();

    let rotation = RefreshToken::rotate(&mm, &system, &expired, Duration::days(7))
        .await
        .unwrap();
    assert!(matches!(rotation, Rotation::Invalid));

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE token_hash = $1")
        .bind(hash_token(&expired))
        .fetch_one(mm.executor())
        .await
        .unwrap();
    assert_eq!(left, 0);
}
