use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::{AuthenticatedUser, UserRole},
};

/// Resolves the user a resource belongs to: the instructor for everything
/// hanging off a course, the author for reviews, enrollments and attempts.
#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

pub async fn check_access<T: HasOwner<OwnerId = O> + Sync, O: PartialEq + Send + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()> {
    // admin can get all resources
    if ctx.user_role() == UserRole::Admin {
        return Ok(());
    }

    let actual_owner = resource.get_owner_id(mm, ctx).await?;

    if actual_owner == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use super::*;
    use crate::model::DbConnection;

    struct Owned(Uuid);

    #[async_trait::async_trait]
    impl HasOwner for Owned {
        type OwnerId = Uuid;

        async fn get_owner_id(
            &self,
            _mm: &ModelManager,
            _ctx: &AuthenticatedUser,
        ) -> DatabaseResult<Self::OwnerId> {
            Ok(self.0)
        }
    }

    fn mm() -> ModelManager {
        ModelManager::new(DbConnection::connect("postgres://localhost/unused").unwrap())
    }

    #[tokio::test]
    async fn owner_passes_stranger_is_forbidden() {
        let mm = mm();
        let owner = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Instructor);
        let stranger = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Instructor);
        let resource = Owned(owner.user_id());

        assert!(check_access(&mm, &owner, &resource, owner.user_id()).await.is_ok());
        let denied = check_access(&mm, &stranger, &resource, stranger.user_id()).await;
        assert!(matches!(denied, Err(DatabaseError::Forbidden)));
    }

    #[tokio::test]
    async fn admin_bypasses_ownership() {
        let mm = mm();
        let resource = Owned(Uuid::new_v4());
        let admin = AuthenticatedUser::admin();
        assert!(check_access(&mm, &admin, &resource, admin.user_id()).await.is_ok());
    }
}
