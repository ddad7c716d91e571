use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Quiz {
    id: Uuid,
    curriculum_id: Uuid,
    title: String,
    description: String,
    pass_percent: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuizCreate {
    pub curriculum_id: Uuid,
    pub title: String,
    pub description: String,
    pub pass_percent: i32,
}

impl ResourceTyped for Quiz {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Quiz
    }
}

impl Quiz {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn curriculum_id(&self) -> Uuid {
        self.curriculum_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pass_percent(&self) -> i32 {
        self.pass_percent
    }
}

#[async_trait]
impl CrudRepository<Quiz, QuizCreate, uuid::Uuid> for Quiz {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        let quiz = sqlx::query_as(
            r#"
            INSERT INTO quizzes (id, curriculum_id, title, description, pass_percent)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.curriculum_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.pass_percent)
        .fetch_one(mm.executor())
        .await?;

        Ok(quiz)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE quizzes SET title = $1, description = $2, pass_percent = $3 WHERE id = $4")
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.pass_percent)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.description = data.description;
        self.pass_percent = data.pass_percent;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quizzes ORDER BY title LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Quiz {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT q.*
            FROM quizzes q
            JOIN curricula c ON c.id = q.curriculum_id
            WHERE c.course_id = $1
            ORDER BY c.position, q.title
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
impl HasOwner for Quiz {
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
