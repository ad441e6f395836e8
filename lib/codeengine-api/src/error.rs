use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid path parameter {name}: {reason}")]
    PathParam { name: String, reason: &'static str },
}

/// Check that a required field is set and holds a non-empty value.
pub(crate) fn require<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref() {
        None => Err(ValidationError::MissingField(field)),
        Some("") => Err(ValidationError::EmptyField(field)),
        Some(v) => Ok(v),
    }
}
