use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Single choice question; `correct_option` indexes into `options`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Question {
    id: Uuid,
    quiz_id: Uuid,
    prompt: String,
    options: Vec<String>,
    correct_option: i32,
    points: i32,
    position: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuestionCreate {
    pub quiz_id: Uuid,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: i32,
    pub points: i32,
}

impl ResourceTyped for Question {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> i32 {
        self.correct_option
    }

    pub fn points(&self) -> i32 {
        self.points
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn is_correct(&self, selected: i32) -> bool {
        selected == self.correct_option
    }
}

impl QuestionCreate {
    pub fn has_valid_answer(&self) -> bool {
        self.correct_option >= 0 && (self.correct_option as usize) < self.options.len()
    }
}

#[async_trait]
impl CrudRepository<Question, QuestionCreate, uuid::Uuid> for Question {
    /// Appended after the last question of the quiz.
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        let question = sqlx::query_as(
            r#"
            INSERT INTO questions (id, quiz_id, prompt, options, correct_option, points, position)
            VALUES ($1,$2,$3,$4,$5,$6,
                (SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE quiz_id = $2))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.quiz_id)
        .bind(&data.prompt)
        .bind(&data.options)
        .bind(data.correct_option)
        .bind(data.points)
        .fetch_one(mm.executor())
        .await?;

        Ok(question)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE questions SET prompt = $1, options = $2, correct_option = $3, points = $4 WHERE id = $5",
        )
        .bind(&data.prompt)
        .bind(&data.options)
        .bind(data.correct_option)
        .bind(data.points)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.prompt = data.prompt;
        self.options = data.options;
        self.correct_option = data.correct_option;
        self.points = data.points;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = $1")
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
            "SELECT * FROM questions ORDER BY quiz_id, position LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Question {
    pub async fn all_by_quiz(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position")
            .bind(quiz_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Question {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner = sqlx::query_scalar(
            r#"
            SELECT co.instructor_id
            FROM quizzes q
            JOIN curricula c ON c.id = q.curriculum_id
            JOIN courses co ON co.id = c.course_id
            WHERE q.id = $1
            "#,
        )
        .bind(self.quiz_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(owner)
    }
}

#[cfg(test)]
impl Question {
    pub fn fixture(correct_option: i32, points: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            prompt: String::from("?"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_option,
            points,
            position: 1,
        }
    }
}
