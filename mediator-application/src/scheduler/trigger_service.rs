use super::job::{JobKey, ScheduledCommandJob};
use crate::error::AppResult;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// 任务触发时的回调
pub type JobCallback = Arc<dyn Fn(ScheduledCommandJob) -> BoxFuture<'static, ()> + Send + Sync>;

/// 外部触发服务
///
/// 负责保存任务并在触发条件满足时调用回调。
/// 一次性任务在最后一次触发后由触发服务移除。
#[async_trait]
pub trait TriggerService: Send + Sync {
    /// 登记任务；同一 `JobKey` 已存在时返回错误
    async fn register(&self, job: ScheduledCommandJob, on_fire: JobCallback) -> AppResult<()>;

    /// 移除任务；返回任务此前是否存在
    async fn unregister(&self, job_key: &JobKey) -> AppResult<bool>;

    async fn contains(&self, job_key: &JobKey) -> bool;

    /// 停止触发新的任务
    async fn shutdown(&self) -> AppResult<()> {
        Ok(())
    }
}
