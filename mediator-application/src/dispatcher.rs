//! 命令分发器（CommandsDispatcher）
//!
//! 进程内中介者：按请求的具体类型找到唯一的处理器，并让请求依次经过管线行为。
//! - 处理器与校验器在构建期登记，`build()` 之后注册表只读；
//! - 同一请求类型登记多个处理器在 `build()` 时报 `AmbiguousHandler`；
//! - 每次分发都在执行上下文中运行，直接调用与调度触发行为一致；
//! - 查询总在空的执行上下文中运行，无法向外层命令的工作单元提出事件。
use crate::{
    behavior::{
        HandlerFn, LoggingBehavior, Pipeline, PipelineBehavior, UnitOfWorkBehavior,
        ValidationBehavior,
    },
    command::Command,
    command_bus::CommandBus,
    command_handler::CommandHandler,
    config::DispatcherConfig,
    context::AppContext,
    error::{AppError, AppResult},
    query::Query,
    query_bus::QueryBus,
    query_handler::QueryHandler,
    request::{BoxAnySend, RequestEnvelope, RequestKind},
    validation::{Validator, ValidatorRegistry},
};
use async_trait::async_trait;
use mediator_domain::eventing::{DomainEventsDispatcher, EventHandler};
use mediator_domain::unit_of_work::{CurrentUnitOfWork, TransactionalResource};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

struct Registration {
    type_id: TypeId,
    name: &'static str,
    kind: RequestKind,
    handler: HandlerFn,
}

/// 已登记请求的描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredRequest {
    pub name: &'static str,
    pub kind: RequestKind,
    pub behaviors: Vec<&'static str>,
}

#[derive(Default)]
pub struct CommandsDispatcherBuilder {
    registrations: Vec<Registration>,
    validators: ValidatorRegistry,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
    resource: Option<Arc<dyn TransactionalResource>>,
    event_handlers: Vec<Arc<dyn EventHandler>>,
    config: DispatcherConfig,
}

impl CommandsDispatcherBuilder {
    /// 登记命令处理器
    pub fn command<C, H>(mut self, handler: Arc<H>) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let f: HandlerFn = Arc::new(move |boxed, ctx| {
            let handler = handler.clone();
            Box::pin(async move {
                let cmd = boxed.downcast::<C>().map_err(|_| AppError::TypeMismatch {
                    expected: C::NAME,
                    found: "unknown",
                })?;
                let output = handler.handle(ctx, *cmd).await?;
                Ok(Box::new(output) as BoxAnySend)
            })
        });
        self.registrations.push(Registration {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
            kind: RequestKind::Command,
            handler: f,
        });
        self
    }

    /// 登记查询处理器
    pub fn query<Q, H>(mut self, handler: Arc<H>) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let f: HandlerFn = Arc::new(move |boxed, ctx| {
            let handler = handler.clone();
            Box::pin(async move {
                let q = boxed.downcast::<Q>().map_err(|_| AppError::TypeMismatch {
                    expected: Q::NAME,
                    found: "unknown",
                })?;
                let dto = handler.handle(ctx, *q).await?;
                Ok(Box::new(dto) as BoxAnySend)
            })
        });
        self.registrations.push(Registration {
            type_id: TypeId::of::<Q>(),
            name: Q::NAME,
            kind: RequestKind::Query,
            handler: f,
        });
        self
    }

    /// 登记请求校验器（同一请求可登记多个）
    pub fn validator<R, V>(mut self, validator: V) -> Self
    where
        R: Send + 'static,
        V: Validator<R> + 'static,
    {
        self.validators.register::<R, V>(validator);
        self
    }

    /// 追加自定义行为（位于内置行为之后、处理器之前）
    pub fn behavior(mut self, behavior: Arc<dyn PipelineBehavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// 命令使用的事务资源
    pub fn resource(mut self, resource: Arc<dyn TransactionalResource>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// 提交后事件处理器（按登记顺序调用）
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> AppResult<CommandsDispatcher> {
        let mut counts: HashMap<TypeId, (&'static str, usize)> = HashMap::new();
        for r in &self.registrations {
            counts.entry(r.type_id).or_insert((r.name, 0)).1 += 1;
        }
        if let Some(&(name, n)) = counts.values().find(|(_, n)| *n > 1) {
            return Err(AppError::AmbiguousHandler {
                request: name,
                registrations: n,
            });
        }

        let has_commands = self
            .registrations
            .iter()
            .any(|r| r.kind == RequestKind::Command);
        if has_commands && self.resource.is_none() {
            return Err(AppError::Configuration(
                "commands are registered but no transactional resource is configured".into(),
            ));
        }

        let events = DomainEventsDispatcher::new(self.event_handlers);
        let mut chain: Vec<Arc<dyn PipelineBehavior>> = vec![
            Arc::new(ValidationBehavior::new(Arc::new(self.validators))),
            Arc::new(LoggingBehavior::new(self.config.clone())),
        ];
        if let Some(resource) = self.resource {
            chain.push(Arc::new(UnitOfWorkBehavior::new(resource, events.clone())));
        }
        chain.extend(self.behaviors);

        let pipelines = self
            .registrations
            .into_iter()
            .map(|r| {
                let pipeline = Pipeline::new(r.name, r.kind, &chain, r.handler);
                (r.type_id, pipeline)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(requests = pipelines.len(), "commands dispatcher built");
        Ok(CommandsDispatcher {
            inner: Arc::new(Inner { pipelines, events }),
        })
    }
}

struct Inner {
    pipelines: HashMap<TypeId, Pipeline>,
    events: DomainEventsDispatcher,
}

#[derive(Clone)]
pub struct CommandsDispatcher {
    inner: Arc<Inner>,
}

impl CommandsDispatcher {
    pub fn builder() -> CommandsDispatcherBuilder {
        CommandsDispatcherBuilder::default()
    }

    /// 分发类型擦除后的请求
    ///
    /// 缺少关联ID时生成一个；调用方已取消时直接返回 `Cancelled`。
    pub async fn send(&self, ctx: &AppContext, request: RequestEnvelope) -> AppResult<BoxAnySend> {
        let Some(pipeline) = self.inner.pipelines.get(&request.type_id()) else {
            return Err(AppError::NoHandlerRegistered(request.name()));
        };
        if ctx.is_cancelled() {
            return Err(AppError::Cancelled(request.name()));
        }

        let mut ctx = ctx.clone();
        ctx.biz = std::mem::take(&mut ctx.biz).ensure_correlation_id();

        match pipeline.kind {
            // 查询不提出事件：即使从命令处理器内发起，也看不到该命令的工作单元
            RequestKind::Query => CurrentUnitOfWork::scope(pipeline.execute(&ctx, request)).await,
            RequestKind::Command => {
                CurrentUnitOfWork::ensure_scope(pipeline.execute(&ctx, request)).await
            }
        }
    }

    /// 是否登记了该请求类型的处理器
    pub fn handles<R: 'static>(&self) -> bool {
        self.inner.pipelines.contains_key(&TypeId::of::<R>())
    }

    /// 已登记的请求（按名称排序）
    pub fn registered_requests(&self) -> Vec<RegisteredRequest> {
        let mut list = self
            .inner
            .pipelines
            .values()
            .map(|p| RegisteredRequest {
                name: p.name,
                kind: p.kind,
                behaviors: p.behavior_names(),
            })
            .collect::<Vec<_>>();
        list.sort_by(|a, b| a.name.cmp(b.name));
        list
    }

    pub fn events(&self) -> &DomainEventsDispatcher {
        &self.inner.events
    }
}

fn downcast_output<T: 'static>(boxed: BoxAnySend, expected: &'static str) -> AppResult<T> {
    boxed
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| AppError::TypeMismatch {
            expected,
            found: "unknown",
        })
}

#[async_trait]
impl CommandBus for CommandsDispatcher {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> AppResult<C::Output> {
        let out = self.send(ctx, RequestEnvelope::command(cmd)).await?;
        downcast_output::<C::Output>(out, C::NAME)
    }
}

#[async_trait]
impl QueryBus for CommandsDispatcher {
    async fn query<Q: Query>(&self, ctx: &AppContext, q: Q) -> AppResult<Q::Dto> {
        let out = self.send(ctx, RequestEnvelope::query(q)).await?;
        downcast_output::<Q::Dto>(out, Q::NAME)
    }
}
