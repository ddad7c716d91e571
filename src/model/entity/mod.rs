mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod profile;
pub use profile::{UserProfile, UserProfileUpdate};

pub(crate) mod course;
pub use course::{Course, CourseCreate, CourseLevel};

mod curriculum;
pub use curriculum::{Curriculum, CurriculumCreate};

mod lesson;
pub use lesson::{Lesson, LessonCreate};

mod quiz;
pub use quiz::{Quiz, QuizCreate};

mod question;
pub use question::{Question, QuestionCreate};

mod quiz_attempt;
pub use quiz_attempt::{Grade, GradedAnswer, QuizAnswer, QuizAttempt, SubmittedAnswer, grade};

mod enrollment;
pub use enrollment::{Enrollment, EnrollmentStatus};

mod review;
pub use review::{Review, ReviewCreate};

mod refresh_token;
pub use refresh_token::{RefreshToken, Rotation};

mod password_reset_token;
pub use password_reset_token::PasswordResetToken;
