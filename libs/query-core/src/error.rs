use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{FilterOperator, FilterType};

/// Machine-readable error codes carried by the wire error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidEntityType,
    InvalidPagination,
    InvalidFilterValue,
    InvalidFilter,
    ValidationError,
    Conflict,
    Forbidden,
    NotFound,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidEntityType => "INVALID_ENTITY_TYPE",
            ErrorCode::InvalidPagination => "INVALID_PAGINATION",
            ErrorCode::InvalidFilterValue => "INVALID_FILTER_VALUE",
            ErrorCode::InvalidFilter => "INVALID_FILTER",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single column filter could not be compiled.
///
/// These never fail a request: the builder drops the offending filter and logs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("operator '{operator}' is not valid for {kind:?} filters")]
    UnsupportedOperator { kind: FilterType, operator: String },

    #[error("operator '{0}' requires a second value")]
    MissingSecondValue(FilterOperator),

    #[error("expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

impl FilterError {
    pub fn type_mismatch(expected: &'static str, got: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            expected,
            got: json_kind(got),
        }
    }
}

pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Input-shape errors rejected at the request boundary, before any data access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown entity type: {0}")]
    InvalidEntityType(String),

    #[error("page must be >= 0 and limit must be between 1 and {max}")]
    InvalidPagination { page: i64, limit: i64, max: u64 },

    #[error("malformed filter: {0}")]
    InvalidFilter(String),

    #[error("malformed filter value for '{column}': {reason}")]
    InvalidFilterValue { column: String, reason: String },

    #[error("malformed request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            QueryError::InvalidEntityType(_) => ErrorCode::InvalidEntityType,
            QueryError::InvalidPagination { .. } => ErrorCode::InvalidPagination,
            QueryError::InvalidFilter(_) => ErrorCode::InvalidFilter,
            QueryError::InvalidFilterValue { .. } => ErrorCode::InvalidFilterValue,
            QueryError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Message that is safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self {
            QueryError::InvalidEntityType(t) => format!("Unknown entity type '{t}'"),
            QueryError::InvalidPagination { max, .. } => {
                format!("Page must be zero or greater and limit must be between 1 and {max}")
            }
            QueryError::InvalidFilter(_) => "The filter is malformed".to_string(),
            QueryError::InvalidFilterValue { column, .. } => {
                format!("The filter value for '{column}' is malformed")
            }
            QueryError::InvalidRequest(_) => "The request is malformed".to_string(),
        }
    }

    pub fn into_body(self) -> ErrorBody {
        let details = match &self {
            QueryError::InvalidPagination { page, limit, max } => {
                Some(serde_json::json!({ "page": page, "limit": limit, "maxLimit": max }))
            }
            QueryError::InvalidFilterValue { column, .. } => {
                Some(serde_json::json!({ "column": column }))
            }
            _ => None,
        };
        ErrorBody {
            code: self.code(),
            message: self.public_message(),
            details,
        }
    }
}

/// `{ code, message, details? }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// `{ error: { code, message, details? } }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl From<ErrorBody> for ErrorEnvelope {
    fn from(error: ErrorBody) -> Self {
        Self { error }
    }
}

impl From<QueryError> for ErrorEnvelope {
    fn from(e: QueryError) -> Self {
        Self {
            error: e.into_body(),
        }
    }
}
