use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{DatabaseResult, HasOwner, ModelManager, ResourceTyped, UnknownVariant},
    web::AuthenticatedUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use EnrollmentStatus::*;

        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Cancelled, Pending)
                | (Cancelled, Active)
        )
    }

    /// Whether course content is unlocked.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

impl TryFrom<&str> for EnrollmentStatus {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant::new("enrollment status", other)),
        }
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    #[sqlx(try_from = "String")]
    status: EnrollmentStatus,
    enrolled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
        status: EnrollmentStatus,
    ) -> DatabaseResult<Self> {
        let enrollment = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, status)
            VALUES ($1,$2,$3,$4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(course_id)
        .bind(status.to_string())
        .fetch_one(mm.executor())
        .await?;
        Ok(enrollment)
    }

    /// No transition check here, callers validate with
    /// [`EnrollmentStatus::can_transition_to`].
    pub async fn set_status(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        status: EnrollmentStatus,
    ) -> DatabaseResult<Self> {
        let enrollment = sqlx::query_as(
            "UPDATE enrollments SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status.to_string())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(enrollment)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_for(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_by_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at DESC",
        )
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE course_id = $1 ORDER BY enrolled_at",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// True when `student_id` holds an active or completed enrollment.
    pub async fn grants_access_to(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<bool> {
        let enrollment = Self::find_for(mm, actor, student_id, course_id).await?;
        Ok(enrollment.is_some_and(|e| e.status().grants_access()))
    }
}

#[async_trait::async_trait]
impl HasOwner for Enrollment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

#[cfg(test)]
mod test {
    use super::EnrollmentStatus::*;
    use super::*;

    #[test]
    fn allowed_transitions() {
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Pending));
        assert!(Cancelled.can_transition_to(Active));
    }

    #[test]
    fn rejected_transitions() {
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Completed));
        for s in [Pending, Active, Completed, Cancelled] {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn access_and_parsing() {
        assert!(Active.grants_access());
        assert!(Completed.grants_access());
        assert!(!Pending.grants_access());
        assert!(!Cancelled.grants_access());
        for s in [Pending, Active, Completed, Cancelled] {
            assert_eq!(EnrollmentStatus::try_from(s.to_string().as_str()).unwrap(), s);
        }
        assert!(EnrollmentStatus::try_from("paused").is_err());
        assert!(EnrollmentStatus::try_from("Active").is_err());
    }
}
