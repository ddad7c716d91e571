use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::entity::UserEntity;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct RegisterBody {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    /// `student` (default) or `instructor`
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LoginBody {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ForgotPasswordBody {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ResetPasswordBody {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ChangePasswordBody {
    pub current_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

/// Returned by register, login and refresh. The same access token is also
/// set as the `SID` cookie.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub user: UserEntity,
    pub access_token: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_rules() {
        let body = RegisterBody {
            email: "ann@example.com".into(),
            password: "secret1".into(),
            full_name: "Ann".into(),
            role: None,
        };
        assert!(body.validate().is_ok());

        let short = RegisterBody {
            password: "12345".into(),
            ..body
        };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn email_must_look_like_one() {
        let body = ForgotPasswordBody {
            email: "not-an-email".into(),
        };
        assert!(body.validate().is_err());
    }
}
