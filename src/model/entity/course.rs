use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Page, UnknownVariant, error::DatabaseResult, repo::CrudRepository};
use crate::web::{AuthenticatedUser, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl TryFrom<&str> for CourseLevel {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(UnknownVariant::new("course level", other)),
        }
    }
}

impl TryFrom<String> for CourseLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl std::fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    instructor_id: Uuid,
    title: String,
    description: String,
    #[sqlx(try_from = "String")]
    level: CourseLevel,
    price_cents: i32,
    thumbnail_url: Option<String>,
    is_published: bool,
    average_rating: f64,
    review_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CourseCreate {
    pub instructor_id: Uuid,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub price_cents: i32,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instructor_id(&self) -> Uuid {
        self.instructor_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn level(&self) -> CourseLevel {
        self.level
    }

    pub fn price_cents(&self) -> i32 {
        self.price_cents
    }

    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn review_count(&self) -> i32 {
        self.review_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Owner and admins see drafts, everybody else only published courses.
    pub fn is_visible_to(&self, actor: Option<&AuthenticatedUser>) -> bool {
        if self.is_published {
            return true;
        }
        actor.is_some_and(|a| a.user_role() == UserRole::Admin || a.user_id() == self.instructor_id)
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, uuid::Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let course = sqlx::query_as(
            r#"
            INSERT INTO courses (id, instructor_id, title, description, level, price_cents, thumbnail_url, is_published)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.instructor_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.level.to_string())
        .bind(data.price_cents)
        .bind(&data.thumbnail_url)
        .bind(data.is_published)
        .fetch_one(mm.executor())
        .await?;

        Ok(course)
    }

    /// `instructor_id` in `data` is ignored, ownership never moves.
    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let course = sqlx::query_as(
            r#"
            UPDATE courses
            SET title = $1, description = $2, level = $3, price_cents = $4,
                thumbnail_url = $5, is_published = $6, updated_at = now()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.level.to_string())
        .bind(data.price_cents)
        .bind(&data.thumbnail_url)
        .bind(data.is_published)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(course)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Published catalogue, newest first.
    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM courses WHERE is_published ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE is_published")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreate, Uuid);

#[async_trait]
impl HasOwner for Course {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.instructor_id)
    }
}

// Utils

impl Course {
    /// Case-insensitive title/description match over published courses.
    pub async fn search(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        term: &str,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Page<Self>> {
        let pattern = contains_pattern(term);

        let items = sqlx::query_as(
            r#"
            SELECT * FROM courses
            WHERE is_published AND (title ILIKE $1 OR description ILIKE $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM courses WHERE is_published AND (title ILIKE $1 OR description ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(mm.executor())
        .await?;

        Ok(Page::new(items, total, limit, offset))
    }

    pub async fn all_by_instructor(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        instructor_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC",
        )
        .bind(instructor_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Row lock that serializes review writes on one course. Take it before
    /// touching `reviews` so [`Course::refresh_rating`] sees every committed review.
    pub async fn lock_for_rating(conn: &mut PgConnection, course_id: Uuid) -> DatabaseResult<()> {
        sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Recomputes the denormalized rating columns from the reviews table.
    pub async fn refresh_rating(conn: &mut PgConnection, course_id: Uuid) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE courses
            SET average_rating = COALESCE(
                    (SELECT ROUND(AVG(rating)::numeric, 2)::float8 FROM reviews WHERE course_id = $1),
                    0
                ),
                review_count = (SELECT COUNT(*) FROM reviews WHERE course_id = $1)::int
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

/// `ILIKE` pattern matching `term` literally anywhere. Backslash is the
/// default escape character, so it is escaped first.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Instructor of the course a child row belongs to.
pub(crate) async fn course_instructor(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Uuid> {
    let owner: Uuid = sqlx::query_scalar("SELECT instructor_id FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
    Ok(owner)
}

#[cfg(test)]
mod test {
    use super::*;

    fn course(instructor_id: Uuid, is_published: bool) -> Course {
        Course {
            id: Uuid::new_v4(),
            instructor_id,
            title: "Rust".into(),
            description: String::new(),
            level: CourseLevel::Advanced,
            price_cents: 0,
            thumbnail_url: None,
            is_published,
            average_rating: 0.0,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn draft_visibility() {
        let owner = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Instructor);
        let other = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Student);
        let draft = course(owner.user_id(), false);

        assert!(draft.is_visible_to(Some(&owner)));
        assert!(draft.is_visible_to(Some(&AuthenticatedUser::admin())));
        assert!(!draft.is_visible_to(Some(&other)));
        assert!(!draft.is_visible_to(None));
        assert!(course(owner.user_id(), true).is_visible_to(None));
    }

    #[test]
    fn level_parsing() {
        assert_eq!(course(Uuid::new_v4(), true).level(), CourseLevel::Advanced);
        assert_eq!(CourseLevel::try_from("intermediate").unwrap(), CourseLevel::Intermediate);
        assert!(CourseLevel::try_from("unknown").is_err());
        assert_eq!(CourseLevel::Intermediate.to_string(), "intermediate");
    }

    #[test]
    fn search_pattern_escapes_wildcards_and_backslash() {
        assert_eq!(contains_pattern("rust"), "%rust%");
        assert_eq!(contains_pattern("100%_"), r"%100\%\_%");
        assert_eq!(contains_pattern(r"C:\"), r"%C:\\%");
        assert_eq!(contains_pattern(r"a\%"), r"%a\\\%%");
    }
}
