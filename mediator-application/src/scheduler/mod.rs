//! 命令调度（Commands Scheduler）
//!
//! - `Trigger`：一次性、固定间隔或 cron 触发条件；
//! - `ScheduledPayload`：带版本号的命令载荷 `{command, version, data}`，配合 `PayloadUpcasterChain` 演进；
//! - `TriggerService`：外部触发服务协议，`CronTriggerService` 为基于 tokio-cron-scheduler 的实现；
//! - `CommandsScheduler`：登记/取消任务，触发时在新的执行上下文中分发命令。
//!
mod commands_scheduler;
mod cron_trigger_service;
mod job;
mod trigger;
mod trigger_service;
mod upcaster;

pub use commands_scheduler::CommandsScheduler;
pub use cron_trigger_service::CronTriggerService;
pub use job::{JobKey, ScheduledCommandJob, ScheduledPayload};
pub use trigger::Trigger;
pub use trigger_service::{JobCallback, TriggerService};
pub use upcaster::{PayloadUpcaster, PayloadUpcasterChain, PayloadUpcasterResult};
