//! Outgoing mail. The server only ever sends password reset links.

use std::sync::Arc;

use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    /// Delivers a reset `token` for `email`.
    async fn send_password_reset(&self, email: &str, token: &str);
}

/// Writes mail to the log instead of sending it.
///
/// The token itself is a credential and only shows up at `debug` level in
/// debug builds.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, token: &str) {
        tracing::info!(%email, "password reset requested");
        #[cfg(debug_assertions)]
        tracing::debug!(%email, "password reset token: {}", token);
        #[cfg(not(debug_assertions))]
        let _ = token;
    }
}

pub type SharedMailer = Arc<dyn Mailer>;
