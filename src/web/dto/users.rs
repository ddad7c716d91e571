use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::entity::{UserEntity, UserProfile, UserProfileUpdate};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserWithProfile {
    pub user: UserEntity,
    /// Absent for admins.
    pub profile: Option<UserProfile>,
}

/// Fields left out stay untouched. Profile fields that don't match the
/// caller's role are ignored.
#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateMeBody {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub headline: Option<String>,
    #[validate(length(max = 200))]
    pub expertise: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

impl UpdateMeBody {
    pub fn profile(&self) -> UserProfileUpdate {
        UserProfileUpdate {
            bio: self.bio.clone(),
            headline: self.headline.clone(),
            expertise: self.expertise.clone(),
            website: self.website.clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleBody {
    pub role: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn website_must_be_url() {
        let body = UpdateMeBody {
            website: Some("definitely not a url".into()),
            ..Default::default()
        };
        assert!(body.validate().is_err());
        assert!(UpdateMeBody::default().validate().is_ok());
    }
}
