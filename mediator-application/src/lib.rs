//! 中介者应用层（mediator-application）
//!
//! - 命令/查询与其处理器、总线协议；
//! - `CommandsDispatcher`：进程内中介者，请求依次经过校验、日志、工作单元行为后到达处理器；
//! - `CommandsScheduler`：把命令交给外部触发服务延迟或周期执行，触发时复用同一条管线。
//!
pub mod behavior;
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod dto;
pub mod error;
pub mod query;
pub mod query_bus;
pub mod query_handler;
pub mod request;
pub mod scheduler;
pub mod validation;

pub use dispatcher::{CommandsDispatcher, CommandsDispatcherBuilder, RegisteredRequest};
pub use scheduler::CommandsScheduler;

// 允许过程宏生成的 ::mediator_application 路径在本 crate 内部解析
extern crate self as mediator_application;
