//! 中介者领域层基础库（mediator-domain）
//!
//! 提供围绕一次逻辑操作的事务与事件构件：
//! - 领域事件（`domain_event`）与调用链业务语境
//! - 工作单元（`unit_of_work`）：事务资源协议、工作单元上下文、环境工作单元访问器
//! - 事件系统（`eventing`）：提交后的领域事件分发器与处理器
//!
//! 本 crate 与存储实现解耦，仅定义事务资源协议与最小必要的错误类型，
//! 以便在不同基础设施（例如 Postgres）上进行适配实现。
//!
//! 典型流程：
//! 1. 在执行上下文中 `UnitOfWork::begin`，成为环境工作单元；
//! 2. 处理器通过 `unit_of_work::raise_event` 向环境工作单元提出事件；
//! 3. `commit` 成功后把返回的事件交给 `DomainEventsDispatcher`；失败或回滚则事件被丢弃。
//!
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod unit_of_work;

// 允许在本 crate 内部通过 ::mediator_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::mediator_domain 路径。
extern crate self as mediator_domain;
