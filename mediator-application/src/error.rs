use crate::validation::ValidationErrors;
use mediator_domain::error::DomainError;

/// 应用层统一错误
///
/// 管线中的行为从不把一种错误转换为另一种：处理器返回什么，调用方就收到什么。
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("no handler registered: {0}")]
    NoHandlerRegistered(&'static str),

    #[error("ambiguous handler: request={request}, registrations={registrations}")]
    AmbiguousHandler {
        request: &'static str,
        registrations: usize,
    },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("configuration: {0}")]
    Configuration(String),

    #[error("invalid trigger: {reason}")]
    InvalidTrigger { reason: String },

    #[error("scheduler: {reason}")]
    Scheduler { reason: String },

    #[error("cancelled: {0}")]
    Cancelled(&'static str),
}

impl AppError {
    pub fn invalid_trigger(reason: impl Into<String>) -> Self {
        Self::InvalidTrigger {
            reason: reason.into(),
        }
    }

    pub fn scheduler(reason: impl Into<String>) -> Self {
        Self::Scheduler {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Domain(DomainError::from(err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
