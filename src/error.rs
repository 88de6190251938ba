use sea_orm::DbErr;

use crate::catalog::FeedError;
use crate::import::ImportError;
use crate::qr::QrError;

pub type StockResult<T> = Result<T, StockError>;

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("no free item code for category {category} after {attempts} attempts")]
    CodeSpaceExhausted { category: String, attempts: u32 },

    #[error("no free category code could be derived from {name:?}")]
    CategoryCodeExhausted { name: String },

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl StockError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StockError::NotFound(what.into())
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StockError::Validation {
            field,
            message: message.into(),
        }
    }
}
