use super::job::{JobKey, ScheduledCommandJob, ScheduledPayload};
use super::trigger::Trigger;
use super::trigger_service::{JobCallback, TriggerService};
use super::upcaster::PayloadUpcasterChain;
use crate::{
    command::SchedulableCommand,
    config::SchedulerConfig,
    context::AppContext,
    dispatcher::CommandsDispatcher,
    error::{AppError, AppResult},
    request::RequestEnvelope,
};
use bon::bon;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use mediator_domain::domain_event::BusinessContext;
use mediator_domain::unit_of_work::CurrentUnitOfWork;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

type DecodeFn = Arc<dyn Fn(Value) -> AppResult<RequestEnvelope> + Send + Sync>;

struct Decoder {
    version: usize,
    decode: DecodeFn,
}

struct SchedulerInner {
    dispatcher: CommandsDispatcher,
    trigger_service: Arc<dyn TriggerService>,
    decoders: DashMap<&'static str, Decoder>,
    upcasters: PayloadUpcasterChain,
    config: SchedulerConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
    closed: AtomicBool,
}

/// 命令调度器
///
/// 把命令连同触发条件交给外部触发服务；触发时还原命令，
/// 在全新的执行上下文中经由 [`CommandsDispatcher`] 分发，
/// 因此调度执行与直接调用经过同样的管线与工作单元语义。
#[derive(Clone)]
pub struct CommandsScheduler {
    inner: Arc<SchedulerInner>,
}

#[bon]
impl CommandsScheduler {
    #[builder]
    pub fn new(
        dispatcher: CommandsDispatcher,
        trigger_service: Arc<dyn TriggerService>,
        #[builder(default)] upcasters: PayloadUpcasterChain,
        #[builder(default)] config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                dispatcher,
                trigger_service,
                decoders: DashMap::new(),
                upcasters,
                config,
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl CommandsScheduler {
    /// 登记可调度命令，使已持久化的任务在进程重启后也能还原
    pub fn register<C: SchedulableCommand>(&self) -> &Self {
        let decode: DecodeFn = Arc::new(|data: Value| {
            let cmd: C = serde_json::from_value(data)?;
            Ok(RequestEnvelope::command(cmd))
        });
        self.inner.decoders.insert(
            C::NAME,
            Decoder {
                version: C::PAYLOAD_VERSION,
                decode,
            },
        );
        self
    }

    pub fn registered_commands(&self) -> Vec<&'static str> {
        let mut names = self
            .inner
            .decoders
            .iter()
            .map(|e| *e.key())
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// 以新生成的 `JobKey` 调度命令
    pub async fn schedule<C: SchedulableCommand>(
        &self,
        cmd: &C,
        trigger: Trigger,
    ) -> AppResult<JobKey> {
        self.schedule_with_key(JobKey::generate(), cmd, trigger).await
    }

    pub async fn schedule_with_key<C: SchedulableCommand>(
        &self,
        job_key: JobKey,
        cmd: &C,
        trigger: Trigger,
    ) -> AppResult<JobKey> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(AppError::scheduler("scheduler is shut down"));
        }
        trigger.validate(Utc::now())?;
        if !self.inner.dispatcher.handles::<C>() {
            return Err(AppError::NoHandlerRegistered(C::NAME));
        }
        if !self.inner.decoders.contains_key(C::NAME) {
            self.register::<C>();
        }

        let payload = ScheduledPayload::encode(cmd)?;
        let job = ScheduledCommandJob::new(job_key.clone(), payload, trigger);
        let next_fire = job.trigger().next_fire_after(Utc::now());
        self.inner
            .trigger_service
            .register(job, self.callback())
            .await?;

        tracing::info!(
            job.key = %job_key,
            command = C::NAME,
            next_fire = ?next_fire,
            "command scheduled"
        );
        Ok(job_key)
    }

    /// 重新登记已持久化的任务（例如进程重启后）
    ///
    /// 载荷在触发时才上抬与解码；已过期的一次性任务会尽快触发。
    pub async fn restore(&self, job: ScheduledCommandJob) -> AppResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(AppError::scheduler("scheduler is shut down"));
        }
        if !job.trigger().is_one_shot() {
            job.trigger().validate(Utc::now())?;
        }
        let job_key = job.job_key().clone();
        let command = job.command().to_string();
        self.inner
            .trigger_service
            .register(job, self.callback())
            .await?;
        tracing::info!(job.key = %job_key, command = %command, "scheduled command restored");
        Ok(())
    }

    /// 取消任务；任务不存在时为空操作
    pub async fn cancel(&self, job_key: &JobKey) -> AppResult<()> {
        let removed = self.inner.trigger_service.unregister(job_key).await?;
        tracing::info!(job.key = %job_key, removed, "scheduled command cancelled");
        Ok(())
    }

    pub async fn is_scheduled(&self, job_key: &JobKey) -> bool {
        self.inner.trigger_service.contains(job_key).await
    }

    /// 停止触发并等待进行中的任务（按配置），超时或不等待时取消它们
    pub async fn shutdown(&self) -> AppResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.trigger_service.shutdown().await?;
        self.inner.tracker.close();

        if self.inner.config.wait_for_jobs_on_shutdown {
            let timeout = self.inner.config.shutdown_timeout;
            if tokio::time::timeout(timeout, self.inner.tracker.wait())
                .await
                .is_err()
            {
                tracing::warn!(
                    in_flight = self.inner.tracker.len(),
                    "timed out waiting for scheduled commands, cancelling"
                );
                self.inner.cancel.cancel();
                self.inner.tracker.wait().await;
            }
        } else {
            self.inner.cancel.cancel();
            self.inner.tracker.wait().await;
        }
        tracing::info!("commands scheduler shut down");
        Ok(())
    }

    fn callback(&self) -> JobCallback {
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        Arc::new(move |job: ScheduledCommandJob| -> BoxFuture<'static, ()> {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.closed.load(Ordering::SeqCst) {
                    tracing::debug!(job.key = %job.job_key(), "scheduler closed, fire skipped");
                    return;
                }
                let tracker = inner.tracker.clone();
                tracker.track_future(inner.run_job(job)).await;
            })
        })
    }
}

impl SchedulerInner {
    async fn run_job(self: Arc<Self>, job: ScheduledCommandJob) {
        let span = tracing::info_span!(
            "scheduled_job",
            job.key = %job.job_key(),
            command = job.command(),
        );

        async move {
            let outcome = match self.decode(job.payload().clone()) {
                Ok(Some(request)) => {
                    let ctx = self.context_for(&job);
                    CurrentUnitOfWork::scope(self.dispatcher.send(&ctx, request))
                        .await
                        .map(|_| true)
                }
                Ok(None) => Ok(false),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(true) => tracing::info!("scheduled command dispatched"),
                Ok(false) => tracing::info!("scheduled payload dropped by upcaster"),
                Err(err) => tracing::error!(error = %err, "scheduled command failed"),
            }

            if job.trigger().is_one_shot() {
                if let Err(err) = self.trigger_service.unregister(job.job_key()).await {
                    tracing::warn!(error = %err, "failed to remove fired one-shot job");
                }
            }
        }
        .instrument(span)
        .await
    }

    /// 上抬并解码载荷；`Ok(None)` 表示载荷被上抬器丢弃
    fn decode(&self, payload: ScheduledPayload) -> AppResult<Option<RequestEnvelope>> {
        let Some(payload) = self.upcasters.upcast(payload)? else {
            return Ok(None);
        };
        let decoder = self
            .decoders
            .get(payload.command.as_str())
            .ok_or_else(|| {
                AppError::scheduler(format!(
                    "no schedulable command registered as `{}`",
                    payload.command
                ))
            })?;
        if payload.version > decoder.version {
            return Err(AppError::scheduler(format!(
                "payload version {} of `{}` is newer than supported version {}",
                payload.version, payload.command, decoder.version
            )));
        }
        (decoder.decode)(payload.data).map(Some)
    }

    fn context_for(&self, job: &ScheduledCommandJob) -> AppContext {
        let biz = BusinessContext::builder()
            .correlation_id(uuid::Uuid::new_v4().to_string())
            .causation_id(job.job_key().to_string())
            .actor_type(self.config.actor_type.clone())
            .actor_id(job.job_key().to_string())
            .build();
        AppContext::new(biz).with_cancellation(self.cancel.child_token())
    }
}
