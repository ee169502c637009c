// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Multiple validation errors")]
    ValidationErrors(Vec<String>),

    #[error("Business logic error: {0}")]
    BusinessLogicError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// APIレイヤーがHTTPステータスへ変換するためのエラー種別
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::ValidationErrors(_) => "validation_errors",
            AppError::BusinessLogicError(_) => "business_logic_error",
            AppError::Conflict(_) => "conflict",
            AppError::InternalServerError(_) => "internal_server_error",
        }
    }
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_mapping() {
        assert_eq!(
            AppError::NotFound("Role not found".to_string()).error_type(),
            "not_found"
        );
        assert_eq!(
            AppError::BusinessLogicError("Circular inheritance detected".to_string()).error_type(),
            "business_logic_error"
        );
        assert_eq!(
            AppError::ValidationErrors(vec!["operation: invalid".to_string()]).error_type(),
            "validation_errors"
        );
    }

    #[test]
    fn test_error_display() {
        let err = AppError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Item not found: User not found");
    }
}
