//! 领域层统一错误定义
//!
//! 聚焦工作单元（Unit of Work）契约、事务资源、事件序列化与事件处理等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error(
        "upcast failed: type={payload_type}, from_version={from_version}, stage={stage:?}, reason={reason}"
    )]
    UpcastFailed {
        payload_type: String,
        from_version: usize,
        stage: Option<&'static str>,
        reason: String,
    },

    // --- 工作单元 / 事务资源 ---
    #[error("ambient conflict: unit of work {active} is still active in this execution context")]
    AmbientConflict { active: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("resource unavailable: {reason}")]
    ResourceUnavailable { reason: String },
    #[error("transaction error: {reason}")]
    Transaction { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },

    // --- 事件系统 ---
    #[error("event handler error: handler={handler}, reason={reason}")]
    EventHandler { handler: String, reason: String },

    // --- 领域规则 ---
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },
}

impl DomainError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn resource_unavailable(reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn transaction(reason: impl Into<String>) -> Self {
        Self::Transaction {
            reason: reason.into(),
        }
    }

    /// 是否为工作单元使用契约被破坏（程序缺陷而非瞬时故障）
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::AmbientConflict { .. } | Self::InvalidState { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DomainError::ResourceUnavailable {
                    reason: err.to_string(),
                }
            }
            other => DomainError::Database {
                reason: other.to_string(),
            },
        }
    }
}

impl From<uuid::Error> for DomainError {
    fn from(err: uuid::Error) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for DomainError {
    fn from(err: chrono::ParseError) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}
