use thiserror::Error;

/// Failures raised by the priority engine. None of them are fatal; the caller
/// decides whether to skip the student, fall back to defaults, or surface it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriorityError {
    #[error("student {student_id} has invalid {field}: {value} (must be >= 0)")]
    InvalidSnapshot {
        student_id: i64,
        field: &'static str,
        value: i64,
    },
    #[error("cannot rank an empty set of students")]
    EmptyInput,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
