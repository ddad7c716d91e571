use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::model::entity::{
    Course, CourseCreate, CourseLevel, Curriculum, CurriculumCreate, Lesson, LessonCreate, Quiz,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CourseBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub price_cents: i32,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl CourseBody {
    pub fn into_create(self, instructor_id: Uuid) -> CourseCreate {
        CourseCreate {
            instructor_id,
            title: self.title,
            description: self.description,
            level: self.level,
            price_cents: self.price_cents,
            thumbnail_url: self.thumbnail_url,
            is_published: self.is_published,
        }
    }
}

/// `position` is 1-based; out of range values are clamped, absent appends.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CurriculumBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub position: Option<i32>,
}

impl CurriculumBody {
    pub fn into_create(self, course_id: Uuid) -> CurriculumCreate {
        CurriculumCreate {
            course_id,
            title: self.title,
            description: self.description,
            position: self.position,
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LessonBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[validate(url)]
    pub video_url: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub duration_minutes: i32,
    #[serde(default)]
    pub is_preview: bool,
    pub position: Option<i32>,
}

impl LessonBody {
    pub fn into_create(self, curriculum_id: Uuid) -> LessonCreate {
        LessonCreate {
            curriculum_id,
            title: self.title,
            content: self.content,
            video_url: self.video_url,
            duration_minutes: self.duration_minutes,
            is_preview: self.is_preview,
            position: self.position,
        }
    }
}

/// Lesson without its content, used in listings and outlines.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonSummary {
    pub id: Uuid,
    pub curriculum_id: Uuid,
    pub title: String,
    pub duration_minutes: i32,
    pub is_preview: bool,
    pub position: i32,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id(),
            curriculum_id: lesson.curriculum_id(),
            title: lesson.title().to_string(),
            duration_minutes: lesson.duration_minutes(),
            is_preview: lesson.is_preview(),
            position: lesson.position(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CurriculumOutline {
    #[serde(flatten)]
    pub curriculum: Curriculum,
    pub lessons: Vec<LessonSummary>,
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub curricula: Vec<CurriculumOutline>,
}

impl CourseOutline {
    /// Groups course-wide lesson and quiz lists under their curricula. Input
    /// order is kept, so pass lessons sorted by position.
    pub fn assemble(
        course: Course,
        curricula: Vec<Curriculum>,
        lessons: &[Lesson],
        quizzes: &[Quiz],
    ) -> Self {
        let curricula = curricula
            .into_iter()
            .map(|curriculum| {
                let id = curriculum.id();
                CurriculumOutline {
                    lessons: lessons
                        .iter()
                        .filter(|l| l.curriculum_id() == id)
                        .map(LessonSummary::from)
                        .collect(),
                    quizzes: quizzes
                        .iter()
                        .filter(|q| q.curriculum_id() == id)
                        .cloned()
                        .collect(),
                    curriculum,
                }
            })
            .collect();

        Self { course, curricula }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_price_rejected() {
        let body: CourseBody =
            serde_json::from_value(serde_json::json!({ "title": "Rust", "price_cents": -1 }))
                .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn course_defaults() {
        let body: CourseBody = serde_json::from_value(serde_json::json!({ "title": "Rust" })).unwrap();
        assert!(body.validate().is_ok());
        let create = body.into_create(Uuid::nil());
        assert_eq!(create.level, CourseLevel::Beginner);
        assert_eq!(create.price_cents, 0);
        assert!(!create.is_published);
    }
}
