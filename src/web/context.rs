//! Request context, e.g. user id, its role, etc.
//!

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::web::{WebResult, error::WebError};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: uuid::Uuid,
    user_role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: uuid::Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    /// System actor used for internal lookups (login, token rotation, etc).
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::Admin,
            user_id: uuid::Uuid::max(), // admin ID
        }
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn is_admin(&self) -> bool {
        self.user_role == UserRole::Admin
    }

    /// Instructors and admins may author courses.
    pub fn can_teach(&self) -> bool {
        matches!(self.user_role, UserRole::Instructor | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    /// Strict parsing, unlike `From<&str>` which falls back to student.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn admin() -> Self {
        Self::new(Some(AuthenticatedUser::admin()))
    }

    pub fn maybe_user(&self) -> Option<&AuthenticatedUser> {
        self.maybe_user.as_ref()
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }

    /// Like [`Self::user`], additionally requires one of `roles`.
    pub fn user_with_role(&self, roles: &[UserRole]) -> WebResult<&AuthenticatedUser> {
        let user = self.user()?;
        if roles.contains(&user.user_role()) {
            Ok(user)
        } else {
            Err(WebError::role_forbidden())
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(UserRole::parse("instructor"), Some(UserRole::Instructor));
        assert_eq!(UserRole::parse("root"), None);
        assert_eq!(UserRole::from("root"), UserRole::Student);
        for role in [UserRole::Student, UserRole::Instructor, UserRole::Admin] {
            assert_eq!(UserRole::from(role.to_string().as_str()), role);
        }
    }

    #[test]
    fn role_gate() {
        let student = AuthenticatedUser::new(uuid::Uuid::new_v4(), UserRole::Student);
        let ctx = RequestContext::new(Some(student));
        assert!(ctx.user_with_role(&[UserRole::Student]).is_ok());
        assert!(ctx.user_with_role(&[UserRole::Instructor, UserRole::Admin]).is_err());
        assert!(RequestContext::new(None).user().is_err());
        assert!(RequestContext::admin().user().unwrap().can_teach());
    }
}
