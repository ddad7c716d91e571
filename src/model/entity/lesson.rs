use crate::model::access::HasOwner;
use crate::model::ordering::{self, OrderedTable};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    curriculum_id: Uuid,
    title: String,
    content: String,
    video_url: Option<String>,
    duration_minutes: i32,
    is_preview: bool,
    position: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LessonCreate {
    pub curriculum_id: Uuid,
    pub title: String,
    pub content: String,
    pub video_url: Option<String>,
    pub duration_minutes: i32,
    pub is_preview: bool,
    pub position: Option<i32>,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn curriculum_id(&self) -> uuid::Uuid {
        self.curriculum_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn duration_minutes(&self) -> i32 {
        self.duration_minutes
    }

    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    pub fn position(&self) -> i32 {
        self.position
    }
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let table = OrderedTable::Lessons;
        let mut tx = mm.begin().await?;

        table.lock_parent(&mut tx, data.curriculum_id).await?;
        let siblings = table.count_children(&mut tx, data.curriculum_id).await?;
        let position = ordering::insert_position(data.position, siblings);
        table
            .apply(&mut tx, data.curriculum_id, ordering::plan_insert(position), None)
            .await?;

        let lesson = sqlx::query_as(
            r#"
            INSERT INTO lessons (id, curriculum_id, title, content, video_url, duration_minutes, is_preview, position)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.curriculum_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(&data.video_url)
        .bind(data.duration_minutes)
        .bind(data.is_preview)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lesson)
    }

    /// Reorders within the current curriculum when `data.position` is set.
    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let table = OrderedTable::Lessons;
        let mut tx = mm.begin().await?;

        let mut position = self.position;
        if let Some(requested) = data.position {
            table.lock_parent(&mut tx, self.curriculum_id).await?;
            position = sqlx::query_scalar("SELECT position FROM lessons WHERE id = $1")
                .bind(self.id)
                .fetch_one(&mut *tx)
                .await?;
            let siblings = table.count_children(&mut tx, self.curriculum_id).await?;
            let target = ordering::move_position(requested, siblings);
            if let Some(shift) = ordering::plan_move(position, target) {
                table.apply(&mut tx, self.curriculum_id, shift, Some(self.id)).await?;
            }
            position = target;
        }

        let lesson = sqlx::query_as(
            r#"
            UPDATE lessons
            SET title = $1, content = $2, video_url = $3, duration_minutes = $4,
                is_preview = $5, position = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.content)
        .bind(&data.video_url)
        .bind(data.duration_minutes)
        .bind(data.is_preview)
        .bind(position)
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lesson)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let table = OrderedTable::Lessons;
        let mut tx = mm.begin().await?;

        table.lock_parent(&mut tx, self.curriculum_id).await?;
        let position: Option<i32> =
            sqlx::query_scalar("DELETE FROM lessons WHERE id = $1 RETURNING position")
                .bind(self.id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(position) = position {
            table
                .apply(&mut tx, self.curriculum_id, ordering::plan_remove(position), None)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT * FROM lessons ORDER BY curriculum_id, position LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Lesson {
    pub async fn all_by_curriculum(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        curriculum_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE curriculum_id = $1 ORDER BY position")
            .bind(curriculum_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    /// Every lesson of a course, in curriculum then lesson order.
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT l.*
            FROM lessons l
            JOIN curricula c ON c.id = l.curriculum_id
            WHERE c.course_id = $1
            ORDER BY c.position, l.position
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let course_id = sqlx::query_scalar("SELECT course_id FROM curricula WHERE id = $1")
            .bind(self.curriculum_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(course_id)
    }
}

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner = sqlx::query_scalar(
            r#"
            SELECT co.instructor_id
            FROM curricula c
            JOIN courses co ON co.id = c.course_id
            WHERE c.id = $1
            "#,
        )
        .bind(self.curriculum_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(owner)
    }
}
