use serde::Serialize;
use serde::de::DeserializeOwned;

/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，通常会修改领域状态。
/// - 经过完整管线（校验 → 日志 → 工作单元），处理器内可提出领域事件；
/// - 与 [`Query`](crate::query::Query) 相对，`Command` 应避免读写混用；
/// - 建议保持语义化的“动宾结构”命名，如 `CreateOrder`、`SendReminder`。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志、追踪与路由（调度任务以此还原命令）。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 命令执行结果（可为 `()`）
    type Output: Send + 'static;
}

/// 可被调度（延迟/周期执行）的命令
///
/// 载荷以 JSON 持久化在调度任务中；结构演进时递增 `PAYLOAD_VERSION`，
/// 并为旧版本注册 [`PayloadUpcaster`](crate::scheduler::PayloadUpcaster)。
pub trait SchedulableCommand: Command + Serialize + DeserializeOwned {
    const PAYLOAD_VERSION: usize = 1;
}
