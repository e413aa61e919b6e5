use query_core::{ErrorBody, ErrorCode, QueryError};
use query_db::FetchError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("User with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Category '{name}' already exists")]
    CategoryNameExists { name: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn email_already_exists(email: String) -> Self {
        Self::EmailAlreadyExists { email }
    }

    pub fn category_name_exists(name: String) -> Self {
        Self::CategoryNameExists { name }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::NotFound { .. } => ErrorCode::NotFound,
            DomainError::EmailAlreadyExists { .. } | DomainError::CategoryNameExists { .. } => {
                ErrorCode::Conflict
            }
            DomainError::Validation { .. } => ErrorCode::ValidationError,
            DomainError::Forbidden { .. } => ErrorCode::Forbidden,
            DomainError::Query(e) => e.code(),
            DomainError::Database { .. } => ErrorCode::DatabaseError,
            DomainError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Wire error body. Storage details are logged here and never leave the server.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            DomainError::Query(e) => e.clone().into_body(),
            DomainError::Database { .. } => {
                tracing::error!(error = ?self, "Database error occurred");
                ErrorBody::new(
                    ErrorCode::DatabaseError,
                    "An internal database error occurred",
                )
            }
            DomainError::Internal { .. } => {
                tracing::error!(error = ?self, "Internal error occurred");
                ErrorBody::new(ErrorCode::InternalError, "An internal error occurred")
            }
            DomainError::NotFound { entity, id } => ErrorBody::new(
                ErrorCode::NotFound,
                format!("{entity} with id {id} was not found"),
            ),
            DomainError::Validation { field, message } => {
                ErrorBody::new(ErrorCode::ValidationError, format!("{field}: {message}"))
                    .with_details(serde_json::json!({ "field": field }))
            }
            other => ErrorBody::new(other.code(), other.to_string()),
        }
    }
}

impl From<FetchError> for DomainError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Query(q) => DomainError::Query(q),
            FetchError::Db(db) => DomainError::database(db.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::database(e.to_string())
    }
}
