//! 基于 tokio-cron-scheduler 的进程内触发服务
use super::job::{JobKey, ScheduledCommandJob};
use super::trigger::Trigger;
use super::trigger_service::{JobCallback, TriggerService};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

#[derive(Clone)]
pub struct CronTriggerService {
    scheduler: JobScheduler,
    // `None` 表示已占位、尚未加入调度器
    jobs: Arc<DashMap<JobKey, Option<Uuid>>>,
}

impl CronTriggerService {
    /// 创建并启动调度循环（需要在 tokio 运行时中调用）
    pub async fn start() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::scheduler(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::scheduler(e.to_string()))?;
        Ok(Self {
            scheduler,
            jobs: Arc::new(DashMap::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn release(&self, key: &JobKey) {
        self.jobs.remove_if(key, |_, id| id.is_none());
    }
}

#[async_trait]
impl TriggerService for CronTriggerService {
    async fn register(&self, job: ScheduledCommandJob, on_fire: JobCallback) -> AppResult<()> {
        let key = job.job_key().clone();
        // 先占位再 await，同一个键的并发登记只有一个能成功
        match self.jobs.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::scheduler(format!(
                    "job `{key}` is already registered"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(None);
            }
        }

        let one_shot = job.trigger().is_one_shot();
        let trigger = job.trigger().clone();
        let jobs = self.jobs.clone();
        let fire: Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync> = Arc::new(move || {
            let job = job.clone();
            let on_fire = on_fire.clone();
            let jobs = jobs.clone();
            Box::pin(async move {
                if one_shot {
                    jobs.remove(job.job_key());
                }
                on_fire(job).await;
            })
        });

        let cron_job = match &trigger {
            Trigger::Once { at } => {
                let delay = (*at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                Job::new_one_shot_async(delay, move |_uuid, _scheduler| fire())
            }
            Trigger::Every { interval } => {
                Job::new_repeated_async(*interval, move |_uuid, _scheduler| fire())
            }
            Trigger::Cron { expression } => {
                Job::new_async(expression.as_str(), move |_uuid, _scheduler| fire())
            }
        };
        let cron_job = match cron_job {
            Ok(cron_job) => cron_job,
            Err(err) => {
                self.release(&key);
                return Err(AppError::invalid_trigger(err.to_string()));
            }
        };

        let id = match self.scheduler.add(cron_job).await {
            Ok(id) => id,
            Err(err) => {
                self.release(&key);
                return Err(AppError::scheduler(err.to_string()));
            }
        };

        let tracked = match self.jobs.get_mut(&key) {
            Some(mut slot) if slot.is_none() => {
                *slot = Some(id);
                true
            }
            _ => false,
        };
        if !tracked {
            // 占位期间已被取消（或一次性任务已触发移除）
            if let Err(err) = self.scheduler.remove(&id).await {
                tracing::warn!(job.key = %key, error = %err, "failed to drop detached job");
            }
        }
        Ok(())
    }

    async fn unregister(&self, job_key: &JobKey) -> AppResult<bool> {
        let Some((_, slot)) = self.jobs.remove(job_key) else {
            return Ok(false);
        };
        // 仍在登记中：登记方发现占位被移除后自行撤下任务
        let Some(id) = slot else {
            return Ok(true);
        };
        self.scheduler
            .remove(&id)
            .await
            .map_err(|e| AppError::scheduler(e.to_string()))?;
        Ok(true)
    }

    async fn contains(&self, job_key: &JobKey) -> bool {
        self.jobs.contains_key(job_key)
    }

    async fn shutdown(&self) -> AppResult<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::scheduler(e.to_string()))?;
        self.jobs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::ScheduledPayload;
    use tokio::sync::mpsc;

    fn job(key: &str, trigger: Trigger) -> ScheduledCommandJob {
        ScheduledCommandJob::new(
            JobKey::new(key),
            ScheduledPayload {
                command: "Tick".into(),
                version: 1,
                data: serde_json::json!({}),
            },
            trigger,
        )
    }

    fn channel_callback() -> (JobCallback, mpsc::UnboundedReceiver<JobKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cb: JobCallback = Arc::new(move |job: ScheduledCommandJob| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(job.job_key().clone());
            })
        });
        (cb, rx)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_shot_fires_once_and_is_removed() {
        let service = CronTriggerService::start().await.unwrap();
        let (cb, mut rx) = channel_callback();
        let at = Utc::now() + chrono::Duration::milliseconds(300);
        service.register(job("once", Trigger::once(at)), cb).await.unwrap();
        assert!(service.contains(&JobKey::new("once")).await);

        let fired = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fired, JobKey::new("once"));
        assert!(!service.contains(&JobKey::new("once")).await);
        service.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_key_is_rejected_and_unregister_is_idempotent() {
        let service = CronTriggerService::start().await.unwrap();
        let (cb, _rx) = channel_callback();
        let trigger = Trigger::every(Duration::from_secs(3600));
        service.register(job("k", trigger.clone()), cb.clone()).await.unwrap();
        let err = service.register(job("k", trigger), cb).await.unwrap_err();
        assert!(matches!(err, AppError::Scheduler { .. }));

        assert!(service.unregister(&JobKey::new("k")).await.unwrap());
        assert!(!service.unregister(&JobKey::new("k")).await.unwrap());
        assert!(service.is_empty());
        service.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_registration_of_one_key_admits_a_single_job() {
        let service = CronTriggerService::start().await.unwrap();
        let (cb, _rx) = channel_callback();
        let trigger = Trigger::every(Duration::from_secs(3600));

        let (first, second) = tokio::join!(
            service.register(job("dup", trigger.clone()), cb.clone()),
            service.register(job("dup", trigger), cb),
        );

        assert_eq!(
            [first.is_ok(), second.is_ok()]
                .iter()
                .filter(|ok| **ok)
                .count(),
            1
        );
        assert!(matches!(
            first.err().or(second.err()),
            Some(AppError::Scheduler { .. })
        ));
        assert_eq!(service.len(), 1);
        assert!(service.unregister(&JobKey::new("dup")).await.unwrap());
        assert!(service.is_empty());
        service.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_trigger_releases_the_key() {
        let service = CronTriggerService::start().await.unwrap();
        let (cb, _rx) = channel_callback();

        let err = service
            .register(
                job("bad", Trigger::Cron { expression: "not a cron".into() }),
                cb.clone(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTrigger { .. }));
        assert!(!service.contains(&JobKey::new("bad")).await);

        service
            .register(job("bad", Trigger::every(Duration::from_secs(3600))), cb)
            .await
            .unwrap();
        assert!(service.contains(&JobKey::new("bad")).await);
        service.shutdown().await.unwrap();
    }
}
