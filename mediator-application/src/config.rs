use bon::Builder;
use std::time::Duration;

/// 命令分发器配置
#[derive(Clone, Debug, Builder)]
pub struct DispatcherConfig {
    /// 超过该耗时的请求以 warn 级别记录
    #[builder(default = Duration::from_millis(500))]
    pub slow_request_threshold: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 命令调度器配置
#[derive(Clone, Debug, Builder)]
pub struct SchedulerConfig {
    /// 调度触发的请求在业务语境中的执行者类型
    #[builder(default = String::from("scheduler"), into)]
    pub actor_type: String,
    /// 关闭时是否等待进行中的任务完成
    #[builder(default = true)]
    pub wait_for_jobs_on_shutdown: bool,
    /// 等待进行中任务的上限
    #[builder(default = Duration::from_secs(30))]
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
