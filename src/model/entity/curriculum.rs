use crate::model::access::HasOwner;
use crate::model::entity::course::course_instructor;
use crate::model::ordering::{self, OrderedTable};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Curriculum {
    id: Uuid,
    course_id: Uuid,
    title: String,
    description: String,
    position: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CurriculumCreate {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: Option<i32>,
}

impl ResourceTyped for Curriculum {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Curriculum
    }
}

impl Curriculum {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn position(&self) -> i32 {
        self.position
    }
}

#[async_trait]
impl CrudRepository<Curriculum, CurriculumCreate, uuid::Uuid> for Curriculum {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CurriculumCreate,
    ) -> DatabaseResult<Self> {
        let table = OrderedTable::Curricula;
        let mut tx = mm.begin().await?;

        table.lock_parent(&mut tx, data.course_id).await?;
        let siblings = table.count_children(&mut tx, data.course_id).await?;
        let position = ordering::insert_position(data.position, siblings);
        table
            .apply(&mut tx, data.course_id, ordering::plan_insert(position), None)
            .await?;

        let curriculum = sqlx::query_as(
            r#"
            INSERT INTO curricula (id, course_id, title, description, position)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(curriculum)
    }

    /// Moves the section when `data.position` is set, `data.course_id` is ignored.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CurriculumCreate,
    ) -> DatabaseResult<Self> {
        let table = OrderedTable::Curricula;
        let mut tx = mm.begin().await?;

        let mut position = self.position;
        if let Some(requested) = data.position {
            table.lock_parent(&mut tx, self.course_id).await?;
            // re-read under the lock, a concurrent move may have shifted us
            position = sqlx::query_scalar("SELECT position FROM curricula WHERE id = $1")
                .bind(self.id)
                .fetch_one(&mut *tx)
                .await?;
            let siblings = table.count_children(&mut tx, self.course_id).await?;
            let target = ordering::move_position(requested, siblings);
            if let Some(shift) = ordering::plan_move(position, target) {
                table.apply(&mut tx, self.course_id, shift, Some(self.id)).await?;
            }
            position = target;
        }

        sqlx::query("UPDATE curricula SET title = $1, description = $2, position = $3 WHERE id = $4")
            .bind(&data.title)
            .bind(&data.description)
            .bind(position)
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.title = data.title;
        self.description = data.description;
        self.position = position;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let table = OrderedTable::Curricula;
        let mut tx = mm.begin().await?;

        table.lock_parent(&mut tx, self.course_id).await?;
        let position: Option<i32> =
            sqlx::query_scalar("DELETE FROM curricula WHERE id = $1 RETURNING position")
                .bind(self.id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(position) = position {
            table
                .apply(&mut tx, self.course_id, ordering::plan_remove(position), None)
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
        let result = sqlx::query_as("SELECT * FROM curricula WHERE id = $1")
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
            "SELECT * FROM curricula ORDER BY course_id, position LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM curricula")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Curriculum {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM curricula WHERE course_id = $1 ORDER BY position")
            .bind(course_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Curriculum {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        course_instructor(mm, self.course_id).await
    }
}
