//! 事件子系统（eventing）
//!
//! 工作单元提交之后的进程内事件扇出：
//! - `EventHandler`：消费某类/多类/全部事件的处理器协议；
//! - `TypedEventHandler`：面向具体 `DomainEvent` 类型编写处理器的适配器；
//! - `DomainEventsDispatcher`：按注册顺序调用匹配的处理器，失败汇总为 `DispatchReport`。
//!
//! 事件分发是尽力而为的：处理器失败不会回滚已提交的工作单元，也不会中断其余处理器。
//!
pub mod dispatcher;
pub mod handler;
pub mod typed;

pub use dispatcher::{DispatchReport, DomainEventsDispatcher, HandlerFailure};
pub use handler::{EventHandler, HandledEventType};
pub use typed::{DomainEventHandler, TypedEventHandler};
