use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,

    #[error("RegistrationRoleNotAllowed")]
    RegistrationRoleNotAllowed,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationCookieNotFound, cookie: {cookie}")]
    AuthenticationCookieNotFound { cookie: String },

    #[error("AuthenticationTokenInvalid, source: {source_name}. Error: {error}")]
    AuthenticationTokenInvalid {
        source_name: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRefreshInvalid")]
    AuthenticationRefreshInvalid,

    #[error("AuthenticationRefreshReused")]
    AuthenticationRefreshReused,

    #[error("AuthenticationResetTokenInvalid")]
    AuthenticationResetTokenInvalid,

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationRoleForbidden")]
    AuthenticationRoleForbidden,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceConflict: {resource_type:?}")]
    ResourceConflict { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}, {reason}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ValidationFailed: {0}")]
    ValidationFailed(#[from] validator::ValidationErrors),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
            Self::RegistrationRoleNotAllowed => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
            Self::RegistrationRoleNotAllowed => {
                String::from("Registration error, role must be student or instructor.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationResetTokenInvalid => StatusCode::BAD_REQUEST,
            Self::AuthenticationRoleForbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationTokenInvalid { .. } => {
                String::from("Authentication error, token invalid or expired.")
            }
            Self::AuthenticationCookieNotFound { .. } => {
                String::from("Authentication error, cookie not found.")
            }
            Self::AuthenticationRefreshInvalid => {
                String::from("Authentication error, refresh token invalid or expired.")
            }
            Self::AuthenticationRefreshReused => {
                String::from("Authentication error, refresh token reuse detected.")
            }
            Self::AuthenticationResetTokenInvalid => {
                String::from("Authentication error, reset token invalid, used or expired.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationRoleForbidden => {
                String::from("Authentication error, your role is not allowed to do this.")
            }
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => String::from("Resource error, resource forbidden."),
            Self::ResourceConflict { .. } => {
                String::from("Resource error, resource already exists.")
            }
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceBadRequest { reason, .. } => {
                format!("Resource error, bad request: {reason}.")
            }
        }
    }
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ValidationFailed(errors) => {
                let mut fields: Vec<_> = errors.field_errors().into_keys().collect();
                fields.sort_unstable();
                format!("Validation error, invalid fields: {}.", fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ValidationError - {0}")]
    ValidationError(#[from] ValidationError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl From<validator::ValidationErrors> for WebError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::ValidationError(ValidationError::ValidationFailed(errors))
    }
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_conflict(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            reason: reason.into(),
        })
    }

    /// Maps repository failures: ownership to 403, unique violations to 409,
    /// everything else to 500.
    pub fn from_database(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden => Self::resource_forbidden(r#type),
            e if e.is_unique_violation() => Self::resource_conflict(r#type),
            e => Self::resource_fetch_error(r#type, e),
        }
    }

    pub fn auth_cookie_not_found<S: Into<String>>(cookie: S) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieNotFound {
            cookie: cookie.into(),
        })
    }

    pub fn auth_token_invalid<S: Into<String>>(
        source_name: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenInvalid {
            source_name: source_name.into(),
            error,
        })
    }

    pub fn auth_refresh_invalid() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRefreshInvalid)
    }

    pub fn auth_refresh_reused() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRefreshReused)
    }

    pub fn auth_reset_token_invalid() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationResetTokenInvalid)
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn role_forbidden() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRoleForbidden)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn registration_role_not_allowed() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationRoleNotAllowed)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ValidationError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ValidationError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Body {
        #[validate(length(min = 6))]
        password: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn database_errors_map_to_status() {
        let forbidden = WebError::from_database(ResourceType::Course, DatabaseError::Forbidden);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let other = WebError::from_database(
            ResourceType::Course,
            DatabaseError::SqlxError(sqlx::Error::RowNotFound),
        );
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_lists_fields() {
        let body = Body {
            password: "123".into(),
            email: "nope".into(),
        };
        let err: WebError = body.validate().unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.client_display(),
            "Validation error, invalid fields: email, password."
        );
    }

    #[test]
    fn auth_statuses() {
        assert_eq!(WebError::auth_refresh_reused().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebError::role_forbidden().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(WebError::auth_reset_token_invalid().status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebError::registration_role_not_allowed().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
