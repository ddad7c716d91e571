pub mod mailer;
pub mod signal;
