use crate::model::access::HasOwner;
use crate::model::entity::Course;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Page, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Review {
    id: Uuid,
    course_id: Uuid,
    student_id: Uuid,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewCreate {
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

impl ResourceTyped for Review {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Review
    }
}

impl Review {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

// Every write recomputes the course rating inside the same transaction.
#[async_trait]
impl CrudRepository<Review, ReviewCreate, uuid::Uuid> for Review {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ReviewCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        Course::lock_for_rating(&mut tx, data.course_id).await?;

        let review: Review = sqlx::query_as(
            r#"
            INSERT INTO reviews (id, course_id, student_id, rating, comment)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.student_id)
        .bind(data.rating)
        .bind(&data.comment)
        .fetch_one(&mut *tx)
        .await?;

        Course::refresh_rating(&mut tx, review.course_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Only `rating` and `comment` are taken from `data`.
    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ReviewCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        Course::lock_for_rating(&mut tx, self.course_id).await?;

        let review: Review = sqlx::query_as(
            r#"
            UPDATE reviews SET rating = $1, comment = $2, updated_at = now()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(data.rating)
        .bind(&data.comment)
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;

        Course::refresh_rating(&mut tx, review.course_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.begin().await?;
        Course::lock_for_rating(&mut tx, self.course_id).await?;
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        Course::refresh_rating(&mut tx, self.course_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM reviews ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Review {
    pub async fn page_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Page<Self>> {
        let items = sqlx::query_as(
            "SELECT * FROM reviews WHERE course_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(course_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(mm.executor())
            .await?;

        Ok(Page::new(items, total, limit, offset))
    }
}

#[async_trait]
impl HasOwner for Review {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}
