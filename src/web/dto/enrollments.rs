use serde::Deserialize;
use validator::Validate;

use crate::model::entity::EnrollmentStatus;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StatusBody {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ReviewBody {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let body = ReviewBody {
                rating,
                comment: String::new(),
            };
            assert_eq!(body.validate().is_ok(), ok, "rating {rating}");
        }
    }

    #[test]
    fn status_is_lowercase() {
        let body: StatusBody = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(body.status, EnrollmentStatus::Completed);
    }
}
