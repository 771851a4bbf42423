//! Core error types used across the system

use thiserror::Error;
use crate::money::MoneyError;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    /// Validates that a text field is non-blank and at most `max_chars` characters long
    pub fn check_text(field: &str, value: &str, max_chars: usize) -> Result<(), CoreError> {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!("{} must not be blank", field)));
        }
        let chars = value.chars().count();
        if chars > max_chars {
            return Err(CoreError::Validation(format!(
                "{} must be at most {} characters, got {}",
                field, max_chars, chars
            )));
        }
        Ok(())
    }
}
