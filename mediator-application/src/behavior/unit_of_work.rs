use super::{Next, PipelineBehavior};
use crate::{
    context::AppContext,
    error::{AppError, AppResult},
    request::{BoxAnySend, RequestEnvelope, RequestKind},
};
use async_trait::async_trait;
use mediator_domain::eventing::DomainEventsDispatcher;
use mediator_domain::unit_of_work::{TransactionalResource, UnitOfWork};
use std::sync::Arc;

/// 工作单元行为（仅命令）
///
/// 开启工作单元并设为环境工作单元，处理器成功则提交并在提交之后分发事件；
/// 处理器失败或调用方取消则回滚，事件被丢弃。
/// 事件分发发生在环境工作单元清理之后，事件处理器可以再分发新的命令。
pub struct UnitOfWorkBehavior {
    resource: Arc<dyn TransactionalResource>,
    events: DomainEventsDispatcher,
}

impl UnitOfWorkBehavior {
    pub fn new(resource: Arc<dyn TransactionalResource>, events: DomainEventsDispatcher) -> Self {
        Self { resource, events }
    }
}

#[async_trait]
impl PipelineBehavior for UnitOfWorkBehavior {
    fn name(&self) -> &'static str {
        "unit_of_work"
    }

    fn applies_to(&self, kind: RequestKind) -> bool {
        kind == RequestKind::Command
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
        next: Next<'_>,
    ) -> AppResult<BoxAnySend> {
        let name = request.name();
        let scope = UnitOfWork::begin_scoped(self.resource.as_ref(), ctx.biz.clone()).await?;

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => None,
            result = next.run(ctx, request) => Some(result),
        };

        match outcome {
            Some(Ok(output)) => {
                let uow_id = scope.id();
                let events = scope.commit().await?;
                tracing::debug!(uow.id = %uow_id, events = events.len(), "unit of work committed");
                if !events.is_empty() {
                    let report = self.events.dispatch(&events).await;
                    if !report.is_clean() {
                        tracing::warn!(
                            uow.id = %uow_id,
                            failures = report.failures.len(),
                            "post-commit event handlers reported failures"
                        );
                    }
                }
                Ok(output)
            }
            Some(Err(err)) => {
                let uow_id = scope.id();
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!(uow.id = %uow_id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
            None => {
                let uow_id = scope.id();
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!(uow.id = %uow_id, error = %rollback_err, "rollback failed");
                }
                tracing::info!(uow.id = %uow_id, request.name = name, "request cancelled, unit of work rolled back");
                Err(AppError::Cancelled(name))
            }
        }
    }
}
