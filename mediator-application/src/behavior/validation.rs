use super::{Next, PipelineBehavior};
use crate::{
    context::AppContext,
    error::{AppError, AppResult},
    request::{BoxAnySend, RequestEnvelope},
    validation::{ValidationErrors, ValidatorRegistry},
};
use async_trait::async_trait;
use std::sync::Arc;

/// 校验行为：任一校验器失败即短路，处理器不会被调用，也不会开启工作单元
pub struct ValidationBehavior {
    validators: Arc<ValidatorRegistry>,
}

impl ValidationBehavior {
    pub fn new(validators: Arc<ValidatorRegistry>) -> Self {
        Self { validators }
    }
}

#[async_trait]
impl PipelineBehavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
        next: Next<'_>,
    ) -> AppResult<BoxAnySend> {
        let errors = self.validators.validate(&request);
        if !errors.is_empty() {
            let errors = ValidationErrors::new(request.name(), errors);
            tracing::warn!(
                request.name = request.name(),
                request.kind = %request.kind(),
                correlation_id = ctx.correlation_id().unwrap_or_default(),
                failures = errors.len(),
                "request rejected by validation"
            );
            return Err(AppError::ValidationFailed(errors));
        }
        next.run(ctx, request).await
    }
}
