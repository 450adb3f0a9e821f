//! 工作单元（Unit of Work）
//!
//! 围绕一次逻辑操作（一次请求或一次调度触发）的事务边界：
//! - `TransactionalResource` / `Transaction`：不透明的存储事务资源协议；
//! - `UnitOfWork`：持有事务句柄与待分发事件队列，状态 `Active → Committed | RolledBack`；
//! - `CurrentUnitOfWork`：基于执行上下文（tokio task-local）的环境工作单元访问器；
//! - `UnitOfWorkScope`：作用域守卫，任何退出路径上都会释放事务并清理环境工作单元。
//!
//! 事件只有在所属工作单元提交成功后才会交给分发器，回滚时一律丢弃。

mod current;
mod in_memory;
#[cfg(feature = "infra-sqlx")]
mod pg;
mod resource;
mod unit_of_work;

pub use current::{CurrentUnitOfWork, raise_event};
pub use in_memory::{InMemoryResource, InMemoryTransaction, ResourceStats};
#[cfg(feature = "infra-sqlx")]
pub use pg::{PgResource, PgTransaction};
pub use resource::{Transaction, TransactionalResource};
pub use unit_of_work::{UnitOfWork, UnitOfWorkScope, UnitOfWorkState};
