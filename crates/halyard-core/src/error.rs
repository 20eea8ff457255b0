use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("{path}: exactly one of [{members}] must be set, found {count}")]
    ExactlyOneOf {
        path: String,
        members: String,
        count: usize,
    },

    #[error("{path}: at most one of [{members}] may be set, found {count}")]
    AtMostOneOf {
        path: String,
        members: String,
        count: usize,
    },

    #[error("{path}: invalid enum value {value:?} (expected one of {allowed})")]
    InvalidEnum {
        path: String,
        value: String,
        allowed: String,
    },

    #[error("{path}: expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
    },

    #[error("unknown field: {0}")]
    UnknownField(String),
}
