use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{DatabaseResult, HasOwner, ModelManager, ResourceTyped, entity::Question},
    web::AuthenticatedUser,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizAttempt {
    id: Uuid,
    quiz_id: Uuid,
    student_id: Uuid,
    score: i32,
    max_score: i32,
    passed: bool,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizAnswer {
    id: Uuid,
    attempt_id: Uuid,
    question_id: Uuid,
    selected_option: i32,
    is_correct: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected_option: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected_option: i32,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: i32,
    pub max_score: i32,
    pub passed: bool,
    pub answers: Vec<GradedAnswer>,
}

/// Scores `answers` against `questions`.
///
/// Answers naming unknown questions are dropped and only the first answer per
/// question counts. Unanswered questions score zero but still count towards
/// `max_score`.
pub fn grade(questions: &[Question], answers: &[SubmittedAnswer], pass_percent: i32) -> Grade {
    let by_id: HashMap<Uuid, &Question> = questions.iter().map(|q| (q.id(), q)).collect();
    let max_score = questions.iter().map(|q| i64::from(q.points())).sum::<i64>();

    let mut graded: Vec<GradedAnswer> = Vec::with_capacity(answers.len());
    for answer in answers {
        let Some(question) = by_id.get(&answer.question_id) else {
            continue;
        };
        if graded.iter().any(|g| g.question_id == answer.question_id) {
            continue;
        }
        graded.push(GradedAnswer {
            question_id: answer.question_id,
            selected_option: answer.selected_option,
            is_correct: question.is_correct(answer.selected_option),
        });
    }

    let score = graded
        .iter()
        .filter(|g| g.is_correct)
        .filter_map(|g| by_id.get(&g.question_id))
        .map(|q| i64::from(q.points()))
        .sum::<i64>();

    let passed = max_score > 0 && score * 100 >= i64::from(pass_percent) * max_score;

    Grade {
        score: saturate(score),
        max_score: saturate(max_score),
        passed,
        answers: graded,
    }
}

fn saturate(total: i64) -> i32 {
    i32::try_from(total).unwrap_or(i32::MAX)
}

impl ResourceTyped for QuizAttempt {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizAttempt
    }
}

impl QuizAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn max_score(&self) -> i32 {
        self.max_score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Stores the attempt with all of its graded answers atomically.
    pub async fn record(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_id: Uuid,
        student_id: Uuid,
        grade: &Grade,
    ) -> DatabaseResult<(Self, Vec<QuizAnswer>)> {
        let mut tx = mm.begin().await?;

        let attempt: QuizAttempt = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts (id, quiz_id, student_id, score, max_score, passed)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(quiz_id)
        .bind(student_id)
        .bind(grade.score)
        .bind(grade.max_score)
        .bind(grade.passed)
        .fetch_one(&mut *tx)
        .await?;

        let mut answers = Vec::with_capacity(grade.answers.len());
        for graded in &grade.answers {
            let answer: QuizAnswer = sqlx::query_as(
                r#"
                INSERT INTO quiz_answers (id, attempt_id, question_id, selected_option, is_correct)
                VALUES ($1,$2,$3,$4,$5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(attempt.id)
            .bind(graded.question_id)
            .bind(graded.selected_option)
            .bind(graded.is_correct)
            .fetch_one(&mut *tx)
            .await?;
            answers.push(answer);
        }

        tx.commit().await?;
        tracing::debug!(
            "quiz {} attempt by {}: {}/{}",
            quiz_id,
            student_id,
            attempt.score,
            attempt.max_score
        );
        Ok((attempt, answers))
    }

    /// `student_id = None` lists everybody's attempts.
    pub async fn all_by_quiz(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_id: Uuid,
        student_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM quiz_attempts
            WHERE quiz_id = $1 AND ($2::uuid IS NULL OR student_id = $2)
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(quiz_id)
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[async_trait::async_trait]
impl HasOwner for QuizAttempt {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

impl QuizAnswer {
    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn selected_option(&self) -> i32 {
        self.selected_option
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}
