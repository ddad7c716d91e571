use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::entity::UserProfile;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    email: String,
    #[serde(skip)]
    password_hash: String,
    full_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: UserRole,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn as_actor(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(self.id, self.role())
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    /// Inserts the user together with the profile row matching its role.
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;

        let user: UserEntity = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.email.to_lowercase())
        .bind(&data.password_hash)
        .bind(&data.full_name)
        .bind(data.role.to_string())
        .fetch_one(&mut *tx)
        .await?;

        UserProfile::ensure(&mut tx, user.id, &data.role).await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Only `email` and `full_name` are taken from `data`.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let email = data.email.to_lowercase();
        sqlx::query("UPDATE users SET email = $1, full_name = $2 WHERE id = $3")
            .bind(&email)
            .bind(&data.full_name)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.email = email;
        self.full_name = data.full_name;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_email(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        email: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn set_password(
        &mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        password_hash: String,
    ) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&password_hash)
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.password_hash = password_hash;
        Ok(())
    }

    /// Changes the role and makes sure the matching profile exists. Profiles of
    /// the previous role are kept so switching back restores them.
    pub async fn set_role(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.to_string())
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        UserProfile::ensure(&mut tx, self.id, &role).await?;
        tx.commit().await?;

        self.role = role.to_string();
        Ok(self)
    }
}
