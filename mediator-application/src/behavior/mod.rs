//! 管线行为（Pipeline Behaviors）
//!
//! 每个请求在到达处理器之前依次经过一组行为，固定顺序为：
//! 校验（Validation）→ 日志（Logging）→ 工作单元（Unit of Work，仅命令）→ 处理器。
//! 自定义行为排在内置行为之后、处理器之前。
//!
//! 行为可以在调用 `next` 之前短路返回，也可以观察 `next` 的结果，
//! 但不会把处理器的错误转换为另一种错误。
mod logging;
mod unit_of_work;
mod validation;

pub use logging::LoggingBehavior;
pub use unit_of_work::UnitOfWorkBehavior;
pub use validation::ValidationBehavior;

use crate::{
    context::AppContext,
    error::AppResult,
    request::{BoxAnySend, RequestEnvelope, RequestKind},
};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) type HandlerFuture<'a> = Pin<Box<dyn Future<Output = AppResult<BoxAnySend>> + Send + 'a>>;

pub(crate) type HandlerFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a AppContext) -> HandlerFuture<'a> + Send + Sync>;

#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    fn name(&self) -> &'static str;

    /// 该行为是否作用于某类请求（默认命令与查询都作用）
    fn applies_to(&self, kind: RequestKind) -> bool {
        let _ = kind;
        true
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
        next: Next<'_>,
    ) -> AppResult<BoxAnySend>;
}

/// 管线中剩余的部分（其后的行为与最终处理器）
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn PipelineBehavior>],
    handler: &'a HandlerFn,
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &AppContext, request: RequestEnvelope) -> AppResult<BoxAnySend> {
        match self.behaviors.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    behaviors: rest,
                    handler: self.handler,
                };
                head.handle(ctx, request, next).await
            }
            None => (self.handler)(request.into_payload(), ctx).await,
        }
    }
}

/// 某个请求类型的完整管线（构建期组装，运行期只读）
pub(crate) struct Pipeline {
    pub(crate) name: &'static str,
    pub(crate) kind: RequestKind,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
    handler: HandlerFn,
}

impl Pipeline {
    pub(crate) fn new(
        name: &'static str,
        kind: RequestKind,
        behaviors: &[Arc<dyn PipelineBehavior>],
        handler: HandlerFn,
    ) -> Self {
        let behaviors = behaviors
            .iter()
            .filter(|b| b.applies_to(kind))
            .cloned()
            .collect();
        Self {
            name,
            kind,
            behaviors,
            handler,
        }
    }

    pub(crate) fn behavior_names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    pub(crate) async fn execute(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> AppResult<BoxAnySend> {
        Next {
            behaviors: &self.behaviors,
            handler: &self.handler,
        }
        .run(ctx, request)
        .await
    }
}
