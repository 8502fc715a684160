use thiserror::Error;

use crate::application::table::TableError;
use crate::config::LoadError;
use crate::infra::error::InfraError;
use crate::infra::http::ApiError;

/// Any failure surfaced by the crate's public entry points.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
}

impl AppError {
    /// Localized text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(err) => err.user_message(),
            AppError::Table(_) => "حدث خطأ في تحميل البيانات".to_string(),
            AppError::Infra(_) | AppError::Config(_) => "حدث خطأ غير متوقع".to_string(),
        }
    }
}
