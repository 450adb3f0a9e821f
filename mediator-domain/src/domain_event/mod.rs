//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、调用链上的业务语境
//! （`BusinessContext`），以及事件被提出（raise）后在工作单元中排队、提交后
//! 分发所使用的标准形态 `SerializedEvent`。

mod business_context;
mod domain_event_trait;
mod serialized_event;

pub use business_context::BusinessContext;
pub use domain_event_trait::DomainEvent;
pub use serialized_event::SerializedEvent;
