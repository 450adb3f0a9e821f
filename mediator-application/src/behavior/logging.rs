use super::{Next, PipelineBehavior};
use crate::{
    config::DispatcherConfig,
    context::AppContext,
    error::AppResult,
    request::{BoxAnySend, RequestEnvelope},
};
use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

/// 日志行为：为每个请求建立 span，记录开始、结果与耗时
pub struct LoggingBehavior {
    config: DispatcherConfig,
}

impl LoggingBehavior {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PipelineBehavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
        next: Next<'_>,
    ) -> AppResult<BoxAnySend> {
        let span = tracing::info_span!(
            "request",
            request.name = request.name(),
            request.kind = %request.kind(),
            correlation_id = ctx.correlation_id().unwrap_or_default(),
        );
        let slow = self.config.slow_request_threshold;

        async move {
            tracing::info!("request started");
            let started = Instant::now();
            let result = next.run(ctx, request).await;
            let elapsed = started.elapsed();
            let duration_ms = elapsed.as_millis() as u64;

            match &result {
                Ok(_) => tracing::info!(duration.ms = duration_ms, "request completed"),
                Err(err) => tracing::error!(duration.ms = duration_ms, error = %err, "request failed"),
            }
            if elapsed > slow {
                tracing::warn!(
                    duration.ms = duration_ms,
                    threshold.ms = slow.as_millis() as u64,
                    "slow request"
                );
            }
            result
        }
        .instrument(span)
        .await
    }
}
