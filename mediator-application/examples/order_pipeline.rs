/// 命令管线示例
/// 展示 校验 -> 日志 -> 工作单元 -> 处理器 的完整链路，以及提交后的领域事件分发
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use mediator_application::command_bus::CommandBus;
use mediator_application::command_handler::CommandHandler;
use mediator_application::context::AppContext;
use mediator_application::dto::Dto;
use mediator_application::error::{AppError, AppResult};
use mediator_application::query_bus::QueryBus;
use mediator_application::query_handler::QueryHandler;
use mediator_application::validation::{FieldError, validator_fn};
use mediator_application::CommandsDispatcher;
use mediator_domain::domain_event::{BusinessContext, SerializedEvent};
use mediator_domain::error::{DomainError, DomainResult};
use mediator_domain::eventing::{DomainEventHandler, HandledEventType, TypedEventHandler};
use mediator_domain::unit_of_work::{
    CurrentUnitOfWork, InMemoryResource, InMemoryTransaction, raise_event,
};
use mediator_macros::{Command, Query, domain_event};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 领域事件与请求
// ============================================================================

#[domain_event]
enum OrderEvent {
    #[event(event_type = "order.created")]
    Created { order_id: String, items: u32 },
}

#[derive(Command, Debug)]
#[command(name = "CreateOrder", output = String)]
struct CreateOrder {
    order_id: String,
    items: u32,
}

#[derive(Query, Debug)]
#[query(name = "GetOrder", dto = OrderView)]
struct GetOrder {
    order_id: String,
}

#[derive(Debug, Serialize)]
struct OrderView {
    order_id: String,
    items: Option<u64>,
}

impl Dto for OrderView {}

// ============================================================================
// 处理器
// ============================================================================

struct CreateOrderHandler;

#[async_trait]
impl CommandHandler<CreateOrder> for CreateOrderHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: CreateOrder) -> AppResult<String> {
        let uow = CurrentUnitOfWork::current()
            .ok_or_else(|| DomainError::invalid_state("no ambient unit of work"))?;
        {
            let mut tx = uow.transaction::<InMemoryTransaction>().await?;
            tx.put(
                format!("order:{}", cmd.order_id),
                serde_json::json!({ "items": cmd.items }),
            );
        }
        raise_event(&OrderEvent::Created {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: cmd.order_id.clone(),
            items: cmd.items,
        })?;
        Ok(cmd.order_id)
    }
}

struct GetOrderHandler {
    store: InMemoryResource,
}

#[async_trait]
impl QueryHandler<GetOrder> for GetOrderHandler {
    async fn handle(&self, _ctx: &AppContext, q: GetOrder) -> AppResult<OrderView> {
        let items = self
            .store
            .get(&format!("order:{}", q.order_id))
            .and_then(|v| v["items"].as_u64());
        Ok(OrderView {
            order_id: q.order_id,
            items,
        })
    }
}

struct ConfirmationMail;

#[async_trait]
impl DomainEventHandler<OrderEvent> for ConfirmationMail {
    async fn handle(&self, event: OrderEvent, meta: &SerializedEvent) -> DomainResult<()> {
        let OrderEvent::Created { order_id, items, .. } = event;
        println!(
            "📧 confirmation for {order_id} ({items} items), correlation={:?}",
            meta.correlation_id()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = InMemoryResource::new();
    let dispatcher = CommandsDispatcher::builder()
        .resource(Arc::new(store.clone()))
        .command::<CreateOrder, _>(Arc::new(CreateOrderHandler))
        .query::<GetOrder, _>(Arc::new(GetOrderHandler {
            store: store.clone(),
        }))
        .validator::<CreateOrder, _>(validator_fn(|c: &CreateOrder| {
            if c.items == 0 {
                vec![FieldError::new("items", "must be greater than 0")]
            } else {
                Vec::new()
            }
        }))
        .event_handler(Arc::new(TypedEventHandler::new(
            "confirmation-mail",
            HandledEventType::One("order.created".into()),
            ConfirmationMail,
        )))
        .build()?;

    let ctx = AppContext::new(
        BusinessContext::builder()
            .correlation_id("demo-1".to_string())
            .actor_type("user".to_string())
            .actor_id("u-1".to_string())
            .build(),
    );

    let id = dispatcher
        .dispatch(
            &ctx,
            CreateOrder {
                order_id: "o-1".into(),
                items: 2,
            },
        )
        .await?;
    println!("✅ created {id}");

    match dispatcher
        .dispatch(
            &ctx,
            CreateOrder {
                order_id: "o-2".into(),
                items: 0,
            },
        )
        .await
    {
        Err(AppError::ValidationFailed(errors)) => println!("❌ rejected: {errors}"),
        other => println!("unexpected: {other:?}"),
    }

    let view = dispatcher
        .query(
            &ctx,
            GetOrder {
                order_id: "o-1".into(),
            },
        )
        .await?;
    println!("🔎 {}", serde_json::to_string(&view)?);
    println!("📊 {:?}", store.stats());

    Ok(())
}
