use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::model::entity::{
    Question, QuestionCreate, Quiz, QuizAnswer, QuizAttempt, QuizCreate, SubmittedAnswer,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct QuizBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, max = 100))]
    pub pass_percent: i32,
}

impl QuizBody {
    pub fn into_create(self, curriculum_id: Uuid) -> QuizCreate {
        QuizCreate {
            curriculum_id,
            title: self.title,
            description: self.description,
            pass_percent: self.pass_percent,
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct QuestionBody {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_option: i32,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 1000))]
    pub points: i32,
}

fn default_points() -> i32 {
    1
}

impl QuestionBody {
    pub fn into_create(self, quiz_id: Uuid) -> QuestionCreate {
        QuestionCreate {
            quiz_id,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            points: self.points,
        }
    }
}

/// Question as shown to a caller. `correct_option` is only filled in for the
/// course owner and admins.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub prompt: String,
    pub options: Vec<String>,
    pub points: i32,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<i32>,
}

impl QuestionView {
    pub fn new(question: &Question, reveal: bool) -> Self {
        Self {
            id: question.id(),
            prompt: question.prompt().to_string(),
            options: question.options().to_vec(),
            points: question.points(),
            position: question.position(),
            correct_option: reveal.then(|| question.correct_option()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AttemptBody {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AttemptResponse {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub answers: Vec<QuizAnswer>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn answer_hidden_unless_revealed() {
        let question = Question::fixture(1, 2);
        let hidden = serde_json::to_value(QuestionView::new(&question, false)).unwrap();
        assert!(hidden.get("correct_option").is_none());

        let shown = QuestionView::new(&question, true);
        assert_eq!(shown.correct_option, Some(1));
        assert_eq!(shown.points, 2);
    }

    #[test]
    fn question_needs_two_options() {
        let body = QuestionBody {
            prompt: "?".into(),
            options: vec!["only".into()],
            correct_option: 0,
            points: 1,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn question_points_are_bounded() {
        let body = |points| QuestionBody {
            prompt: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_option: 0,
            points,
        };
        assert!(body(1000).validate().is_ok());
        assert!(body(1001).validate().is_err());
        assert!(body(2_000_000_000).validate().is_err());
        assert!(body(0).validate().is_err());
    }

    #[test]
    fn pass_percent_range() {
        let body = QuizBody {
            title: "Quiz".into(),
            description: String::new(),
            pass_percent: 101,
        };
        assert!(body.validate().is_err());
    }
}
