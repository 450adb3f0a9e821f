//! 事务资源协议
//!
//! 核心只消费 “开始事务 / 提交 / 回滚” 语义与一个可供处理器读写的会话句柄，
//! 不关心存储的查询语言与表结构。
//!
use crate::error::DomainResult;
use async_trait::async_trait;
use std::any::Any;

/// 一次已开始的存储事务
///
/// 由 `UnitOfWork` 独占持有；处理器通过 [`UnitOfWork::transaction`](super::UnitOfWork::transaction)
/// 以具体类型借用。
#[async_trait]
pub trait Transaction: Any + Send {
    /// 持久化本事务内的变更
    async fn commit(self: Box<Self>) -> DomainResult<()>;

    /// 放弃本事务内的变更
    async fn rollback(self: Box<Self>) -> DomainResult<()>;

    /// 供工作单元按具体类型向下转型
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// 事务资源：负责获取新的事务句柄
#[async_trait]
pub trait TransactionalResource: Send + Sync {
    /// 开始一个新事务；资源无法获取时返回 `ResourceUnavailable`
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>>;
}
