use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    auth::{generate_opaque_token, hash_token},
    model::{DatabaseResult, ModelManager, ResourceTyped},
    web::AuthenticatedUser,
};

/// Server side record of a refresh token. The plain token only ever exists
/// in the client's cookie, here we keep its SHA-256 digest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

/// Outcome of presenting a refresh token.
#[derive(Debug)]
pub enum Rotation {
    /// Old token revoked, `token` is its successor.
    Rotated { user_id: Uuid, token: String },
    /// A revoked token came back. Every token of `user_id` has been revoked.
    Reused { user_id: Uuid },
    /// Unknown or expired.
    Invalid,
}

impl ResourceTyped for RefreshToken {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::RefreshToken
    }
}

impl RefreshToken {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Issues a fresh token for `user_id`, returns the plain value.
    pub async fn issue(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
        ttl: chrono::Duration,
    ) -> DatabaseResult<String> {
        let mut conn = mm.executor().acquire().await?;
        Self::insert(&mut conn, user_id, ttl).await
    }

    async fn insert(
        conn: &mut sqlx::PgConnection,
        user_id: Uuid,
        ttl: chrono::Duration,
    ) -> DatabaseResult<String> {
        let token = generate_opaque_token();
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) VALUES ($1,$2,$3,$4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(Utc::now() + ttl)
        .execute(conn)
        .await?;
        Ok(token)
    }

    /// Single-use exchange of `token` for a new one.
    pub async fn rotate(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        token: &str,
        ttl: chrono::Duration,
    ) -> DatabaseResult<Rotation> {
        let mut tx = mm.begin().await?;

        let found: Option<RefreshToken> =
            sqlx::query_as("SELECT * FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE")
                .bind(hash_token(token))
                .fetch_optional(&mut *tx)
                .await?;

        let Some(found) = found else {
            return Ok(Rotation::Invalid);
        };

        if found.revoked {
            let revoked = sqlx::query(
                "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked",
            )
            .bind(found.user_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            tracing::warn!(
                "refresh token reuse for user {}, revoked {} tokens",
                found.user_id,
                revoked.rows_affected()
            );
            return Ok(Rotation::Reused {
                user_id: found.user_id,
            });
        }

        if found.is_expired() {
            sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
                .bind(found.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(Rotation::Invalid);
        }

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(found.id)
            .execute(&mut *tx)
            .await?;
        let token = Self::insert(&mut tx, found.user_id, ttl).await?;
        tx.commit().await?;

        Ok(Rotation::Rotated {
            user_id: found.user_id,
            token,
        })
    }

    /// Revokes the token if it exists. Returns whether anything changed.
    pub async fn revoke(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        token: &str,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1 AND NOT revoked")
            .bind(hash_token(token))
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_all_for_user(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
            .bind(user_id)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn cleanup_expired(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < now()")
            .execute(mm.executor())
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    fn token(expires_in: Duration) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: hash_token("plain"),
            expires_at: Utc::now() + expires_in,
            revoked: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry() {
        let fresh = token(Duration::days(7));
        assert!(!fresh.is_expired());
        assert!(!fresh.is_revoked());
        assert!(token(Duration::seconds(-1)).is_expired());
    }

    #[test]
    fn stores_digest_not_plain_value() {
        let t = token(Duration::days(1));
        assert_ne!(t.token_hash, "plain");
        assert_eq!(t.token_hash, hash_token("plain"));
    }
}
