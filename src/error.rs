use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// What was wrong with a candidate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Missing,
    WrongType,
    Empty,
    UnknownKey,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Violation::Missing => "required field is missing",
            Violation::WrongType => "value has the wrong type",
            Violation::Empty => "required field is empty",
            Violation::UnknownKey => "key is not part of the schema",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}`: {violation}")]
pub struct ValidationError {
    pub field: String,
    pub violation: Violation,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        ValidationError {
            field: field.into(),
            violation,
        }
    }
}

/// Fatal pipeline outcomes. Everything else is recovered.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input error: {0}")]
    Input(String),
    #[error("baseline extractor produced an invalid record: {0}")]
    InternalConsistency(#[source] ValidationError),
}

/// Enhancement failures. Never fatal; the pipeline keeps the baseline.
#[derive(Debug, Error)]
pub enum EnhancementError {
    #[error("no API key available in ${0}")]
    MissingCredentials(String),
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("candidate rejected: {0}")]
    Invalid(#[from] ValidationError),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}
