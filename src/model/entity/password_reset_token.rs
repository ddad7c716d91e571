use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    auth::{generate_opaque_token, hash_token},
    model::{DatabaseResult, ModelManager, ResourceTyped},
    web::AuthenticatedUser,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordResetToken {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for PasswordResetToken {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::PasswordResetToken
    }
}

impl PasswordResetToken {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }

    /// Replaces any pending reset for `user_id`, returns the plain token.
    pub async fn issue(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
        ttl: chrono::Duration,
    ) -> DatabaseResult<String> {
        let token = generate_opaque_token();
        let mut tx = mm.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at) VALUES ($1,$2,$3,$4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(Utc::now() + ttl)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(token)
    }

    /// Redeems `token`: marks it used, stores `password_hash` for its owner and
    /// revokes every refresh token of that owner, all in one transaction.
    /// `None` when the token is unknown, expired or already used; nothing is
    /// written then.
    pub async fn redeem(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        token: &str,
        password_hash: &str,
    ) -> DatabaseResult<Option<Uuid>> {
        let mut tx = mm.begin().await?;

        let found: Option<PasswordResetToken> =
            sqlx::query_as("SELECT * FROM password_reset_tokens WHERE token_hash = $1 FOR UPDATE")
                .bind(hash_token(token))
                .fetch_optional(&mut *tx)
                .await?;

        let Some(found) = found.filter(|t| t.is_usable_at(Utc::now())) else {
            return Ok(None);
        };

        sqlx::query("UPDATE password_reset_tokens SET used_at = now() WHERE id = $1")
            .bind(found.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(found.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
            .bind(found.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(found.user_id))
    }
}
