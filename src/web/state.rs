use std::sync::Arc;

use crate::{
    model::ModelManager,
    utils::mailer::{LogMailer, SharedMailer},
};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    mailer: SharedMailer,
}

impl AppState {
    pub fn new(mm: ModelManager) -> Self {
        Self::with_mailer(mm, Arc::new(LogMailer))
    }

    pub fn with_mailer(mm: ModelManager, mailer: SharedMailer) -> Self {
        Self { mm, mailer }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn mailer(&self) -> &SharedMailer {
        &self.mailer
    }
}
