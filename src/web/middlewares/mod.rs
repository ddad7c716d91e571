mod auth;
pub use auth::{AUTH_TOKEN, REFRESH_TOKEN, extract_context_fn};
