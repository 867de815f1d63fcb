use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid score: {0}. score must be in [0, 100]")]
    InvalidScore(u16),
    #[error("invalid pass threshold: {0}. threshold must be in [0, 100]")]
    InvalidThreshold(u16),
    #[error("unknown role: {0}")]
    UnknownRole(String),
}
