use clap::{Parser, Subcommand};
use syllabus::Config;
use syllabus::error::AppResult;
use syllabus::model::entity::{
    Course, CourseCreate, CourseLevel, Curriculum, CurriculumCreate, Lesson, LessonCreate,
    UserEntity, UserEntityCreateUpdate,
};
use syllabus::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use syllabus::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the course catalogue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage curricula
    Curriculum {
        #[command(subcommand)]
        action: CurriculumCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        /// student, instructor or admin
        #[arg(long, default_value = "student")]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Email of the owning instructor
        #[arg(long)]
        instructor: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "beginner")]
        level: String,
        #[arg(long, default_value_t = 0)]
        price_cents: i32,
        #[arg(long, default_value_t = false)]
        published: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CurriculumCommands {
    Add {
        /// Course title to attach the curriculum to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Curriculum title to attach the lesson to
        #[arg(long)]
        curriculum_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        #[arg(long)]
        video_url: Option<String>,
        #[arg(long, default_value_t = 0)]
        duration_minutes: i32,
        #[arg(long, default_value_t = false)]
        preview: bool,
    },
}

fn invalid_input(msg: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)
}

async fn id_by_title(mm: &ModelManager, table: &str, title: &str) -> AppResult<uuid::Uuid> {
    let id: Option<uuid::Uuid> =
        sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE title = $1 LIMIT 1"))
            .bind(title)
            .fetch_optional(mm.executor())
            .await
            .map_err(DatabaseError::SqlxError)?;

    id.ok_or_else(|| invalid_input(format!("no row in {table} titled {title:?}")).into())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_uri = match std::env::var("DATABASE_URL") {
        Ok(uri) => uri,
        Err(_) => Config::get_or_init(true).await.app().database_uri().to_string(),
    };

    let mm = ModelManager::new(DbConnection::connect(&database_uri)?);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                email,
                password,
                full_name,
                role,
            } => {
                let role = UserRole::parse(&role)
                    .ok_or_else(|| invalid_input(format!("unknown role {role:?}")))?;
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        email,
                        password_hash: syllabus::auth::hash_password(&password)?,
                        full_name,
                        role,
                    },
                )
                .await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                instructor,
                title,
                description,
                level,
                price_cents,
                published,
            } => {
                let level = CourseLevel::try_from(level.as_str())
                    .map_err(|e| invalid_input(e.to_string()))?;
                let owner = UserEntity::find_by_email(&mm, &actor, &instructor)
                    .await?
                    .ok_or_else(|| invalid_input(format!("no user with email {instructor:?}")))?;

                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        instructor_id: owner.id(),
                        title,
                        description,
                        level,
                        price_cents,
                        thumbnail_url: None,
                        is_published: published,
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Curriculum { action } => match action {
            CurriculumCommands::Add {
                course_title,
                title,
                description,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;
                let curriculum = Curriculum::create(
                    &mm,
                    &actor,
                    CurriculumCreate {
                        course_id,
                        title,
                        description,
                        position: None,
                    },
                )
                .await?;
                println!("Curriculum created: {:?}", curriculum);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                curriculum_title,
                title,
                file,
                video_url,
                duration_minutes,
                preview,
            } => {
                let curriculum_id = id_by_title(&mm, "curricula", &curriculum_title).await?;
                let content = std::fs::read_to_string(file)?;
                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        curriculum_id,
                        title,
                        content,
                        video_url,
                        duration_minutes,
                        is_preview: preview,
                        position: None,
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },
    }

    Ok(())
}
