use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, prelude::FromRow};
use uuid::Uuid;

use crate::{
    model::{DatabaseResult, ModelManager},
    web::UserRole,
};

/// Role specific profile. Students have `headline`, instructors have
/// `expertise` and `website`, admins have no profile at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserProfile {
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfileUpdate {
    pub bio: Option<String>,
    pub headline: Option<String>,
    pub expertise: Option<String>,
    pub website: Option<String>,
}

impl UserProfile {
    pub async fn ensure(conn: &mut PgConnection, user_id: Uuid, role: &UserRole) -> DatabaseResult<()> {
        let sql = match role {
            UserRole::Student => {
                "INSERT INTO student_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"
            }
            UserRole::Instructor => {
                "INSERT INTO instructor_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"
            }
            UserRole::Admin => return Ok(()),
        };
        sqlx::query(sql).bind(user_id).execute(conn).await?;
        Ok(())
    }

    pub async fn find(mm: &ModelManager, user_id: Uuid, role: &UserRole) -> DatabaseResult<Option<Self>> {
        let sql = match role {
            UserRole::Student => {
                "SELECT bio, headline, NULL::text AS expertise, NULL::text AS website \
                 FROM student_profiles WHERE user_id = $1"
            }
            UserRole::Instructor => {
                "SELECT bio, NULL::text AS headline, expertise, website \
                 FROM instructor_profiles WHERE user_id = $1"
            }
            UserRole::Admin => return Ok(None),
        };
        let profile = sqlx::query_as(sql)
            .bind(user_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(profile)
    }

    /// Fields that don't belong to `role` are ignored.
    pub async fn update(
        mm: &ModelManager,
        user_id: Uuid,
        role: &UserRole,
        data: UserProfileUpdate,
    ) -> DatabaseResult<Option<Self>> {
        match role {
            UserRole::Student => {
                sqlx::query(
                    r#"
                    UPDATE student_profiles
                    SET bio = COALESCE($2, bio), headline = COALESCE($3, headline)
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(data.bio)
                .bind(data.headline)
                .execute(mm.executor())
                .await?;
            }
            UserRole::Instructor => {
                sqlx::query(
                    r#"
                    UPDATE instructor_profiles
                    SET bio = COALESCE($2, bio),
                        expertise = COALESCE($3, expertise),
                        website = COALESCE($4, website)
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(data.bio)
                .bind(data.expertise)
                .bind(data.website)
                .execute(mm.executor())
                .await?;
            }
            UserRole::Admin => return Ok(None),
        }

        Self::find(mm, user_id, role).await
    }
}
