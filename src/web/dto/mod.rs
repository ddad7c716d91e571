mod auth;
pub use auth::{
    ChangePasswordBody, ForgotPasswordBody, LoginBody, RegisterBody, ResetPasswordBody,
    SessionResponse,
};

mod users;
pub use users::{RoleBody, UpdateMeBody, UserWithProfile};

mod courses;
pub use courses::{CourseBody, CourseOutline, CurriculumBody, CurriculumOutline, LessonBody, LessonSummary};

mod quizzes;
pub use quizzes::{AttemptBody, AttemptResponse, QuestionBody, QuestionView, QuizBody, QuizDetail};

mod enrollments;
pub use enrollments::{ReviewBody, StatusBody};
