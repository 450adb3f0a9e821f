//! PostgreSQL 事务资源（feature = "infra-sqlx"）
//!
//! 以 `sqlx::PgPool` 作为事务资源；处理器通过
//! `uow.transaction::<PgTransaction>()` 借用连接执行读写。
//!
use super::resource::{Transaction, TransactionalResource};
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};
use std::any::Any;

#[derive(Clone)]
pub struct PgResource {
    pool: PgPool,
}

impl PgResource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionalResource for PgResource {
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>> {
        let inner = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::resource_unavailable(e.to_string()))?;
        Ok(Box::new(PgTransaction { inner }))
    }
}

pub struct PgTransaction {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    /// 事务内的连接
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.inner
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.inner.commit().await.map_err(transaction_error)
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.inner.rollback().await.map_err(transaction_error)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// 提交与回滚失败统一报为 `Transaction`，与其它事务资源一致
fn transaction_error(err: sqlx::Error) -> DomainError {
    DomainError::transaction(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_failures_surface_as_transaction_errors() {
        for err in [sqlx::Error::PoolClosed, sqlx::Error::RowNotFound] {
            assert!(matches!(
                transaction_error(err),
                DomainError::Transaction { .. }
            ));
        }
    }
}
