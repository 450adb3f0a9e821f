#![allow(dead_code)]

use async_trait::async_trait;
use mediator_application::command_handler::CommandHandler;
use mediator_application::context::AppContext;
use mediator_application::dto::Dto;
use mediator_application::error::{AppError, AppResult};
use mediator_application::query_handler::QueryHandler;
use mediator_application::scheduler::{JobCallback, JobKey, ScheduledCommandJob, TriggerService};
use mediator_application::validation::{FieldError, Validator};
use mediator_domain::domain_event::SerializedEvent;
use mediator_domain::error::{DomainError, DomainResult};
use mediator_domain::eventing::{EventHandler, HandledEventType};
use mediator_domain::unit_of_work::{
    CurrentUnitOfWork, InMemoryResource, InMemoryTransaction, raise_event,
};
use mediator_macros::{Command, Query, domain_event};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

#[domain_event]
pub enum OrderEvent {
    #[event(event_type = "order.created")]
    OrderCreated { order_id: String, items: u32 },
}

pub fn order_created(order_id: &str, items: u32) -> OrderEvent {
    OrderEvent::OrderCreated {
        id: uuid::Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        items,
    }
}

#[derive(Command, Debug, Clone)]
#[command(name = "CreateOrder", output = String)]
pub struct CreateOrder {
    pub order_id: String,
    pub items: u32,
    pub fail_after_raise: bool,
}

impl CreateOrder {
    pub fn new(order_id: &str, items: u32) -> Self {
        Self {
            order_id: order_id.to_string(),
            items,
            fail_after_raise: false,
        }
    }

    pub fn failing(order_id: &str, items: u32) -> Self {
        Self {
            fail_after_raise: true,
            ..Self::new(order_id, items)
        }
    }
}

pub struct ItemsMustBePositive;

impl Validator<CreateOrder> for ItemsMustBePositive {
    fn validate(&self, request: &CreateOrder) -> Vec<FieldError> {
        if request.items == 0 {
            vec![FieldError::new("items", "must be greater than 0")]
        } else {
            Vec::new()
        }
    }
}

/// 写入订单并提出 `order.created`
#[derive(Default)]
pub struct CreateOrderHandler {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl CommandHandler<CreateOrder> for CreateOrderHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: CreateOrder) -> AppResult<String> {
        *self.calls.lock() += 1;
        let uow = CurrentUnitOfWork::current()
            .ok_or_else(|| DomainError::invalid_state("command runs without a unit of work"))?;
        {
            let mut tx = uow.transaction::<InMemoryTransaction>().await?;
            tx.put(
                format!("order:{}", cmd.order_id),
                serde_json::json!({ "items": cmd.items }),
            );
        }
        raise_event(&order_created(&cmd.order_id, cmd.items))?;

        if cmd.fail_after_raise {
            return Err(DomainError::InvalidCommand {
                reason: "inventory exhausted".into(),
            }
            .into());
        }
        Ok(cmd.order_id)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OrderDto {
    pub order_id: String,
    pub items: Option<u64>,
}

impl Dto for OrderDto {}

#[derive(Query, Debug)]
#[query(name = "GetOrder", dto = OrderDto)]
pub struct GetOrder {
    pub order_id: String,
}

/// 直接读取已提交的数据，并记录查询内能否看到工作单元
pub struct GetOrderHandler {
    pub resource: InMemoryResource,
    pub saw_ambient: Mutex<Vec<bool>>,
    pub raise_errors: Mutex<Vec<String>>,
}

impl GetOrderHandler {
    pub fn new(resource: InMemoryResource) -> Self {
        Self {
            resource,
            saw_ambient: Mutex::new(Vec::new()),
            raise_errors: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryHandler<GetOrder> for GetOrderHandler {
    async fn handle(&self, _ctx: &AppContext, q: GetOrder) -> AppResult<OrderDto> {
        self.saw_ambient
            .lock()
            .push(CurrentUnitOfWork::current().is_some());
        if let Err(err) = raise_event(&order_created(&q.order_id, 0)) {
            self.raise_errors.lock().push(err.to_string());
        }
        let items = self
            .resource
            .get(&format!("order:{}", q.order_id))
            .and_then(|v| v.get("items").and_then(|i| i.as_u64()));
        Ok(OrderDto {
            order_id: q.order_id,
            items,
        })
    }
}

/// 事件处理器调用记录
#[derive(Clone, Debug, PartialEq)]
pub struct SeenEvent {
    pub handler: String,
    pub event_type: String,
    pub correlation_id: Option<String>,
    pub committed: bool,
}

/// 记录收到的事件，以及此时订单数据是否已提交
pub struct RecordingEventHandler {
    pub name: String,
    pub resource: InMemoryResource,
    pub seen: Arc<Mutex<Vec<SeenEvent>>>,
    pub fail: bool,
}

impl RecordingEventHandler {
    pub fn new(name: &str, resource: &InMemoryResource, seen: &Arc<Mutex<Vec<SeenEvent>>>) -> Self {
        Self {
            name: name.to_string(),
            resource: resource.clone(),
            seen: seen.clone(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    fn handler_name(&self) -> &str {
        &self.name
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One("order.created".into())
    }

    async fn handle(&self, event: &SerializedEvent) -> DomainResult<()> {
        let payload = event.payload();
        let order_id = payload
            .get("order_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        self.seen.lock().push(SeenEvent {
            handler: self.name.clone(),
            event_type: event.event_type().to_string(),
            correlation_id: event.correlation_id().map(str::to_string),
            committed: self.resource.get(&format!("order:{order_id}")).is_some(),
        });
        if self.fail {
            return Err(DomainError::EventHandler {
                handler: self.name.clone(),
                reason: "mailbox full".into(),
            });
        }
        Ok(())
    }
}

/// 长时间运行的命令：开始后通知，然后等待被取消
#[derive(Command, Debug)]
#[command(name = "SlowCommand")]
pub struct SlowCommand {
    pub key: String,
}

pub struct SlowCommandHandler {
    pub started: Arc<Notify>,
}

#[async_trait]
impl CommandHandler<SlowCommand> for SlowCommandHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: SlowCommand) -> AppResult<()> {
        let uow = CurrentUnitOfWork::current()
            .ok_or_else(|| DomainError::invalid_state("command runs without a unit of work"))?;
        {
            let mut tx = uow.transaction::<InMemoryTransaction>().await?;
            tx.put(cmd.key, serde_json::json!(true));
        }
        self.started.notify_one();
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        Ok(())
    }
}

#[derive(Command, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(name = "SendReminder", schedulable)]
pub struct SendReminder {
    pub order_id: u64,
}

/// 记录收到的提醒命令与其上下文
#[derive(Default)]
pub struct SendReminderHandler {
    pub received: Mutex<Vec<(SendReminder, AppContext)>>,
    pub fail: bool,
}

#[async_trait]
impl CommandHandler<SendReminder> for SendReminderHandler {
    async fn handle(&self, ctx: &AppContext, cmd: SendReminder) -> AppResult<()> {
        self.received.lock().push((cmd, ctx.clone()));
        if self.fail {
            return Err(AppError::Domain(DomainError::NotFound {
                reason: "order missing".into(),
            }));
        }
        Ok(())
    }
}

/// 手动触发的触发服务：测试直接决定任务何时触发
#[derive(Default)]
pub struct ManualTriggerService {
    jobs: Mutex<HashMap<JobKey, (ScheduledCommandJob, JobCallback)>>,
    shut_down: Mutex<bool>,
}

impl ManualTriggerService {
    /// 触发任务；一次性任务在触发前移除。任务不存在时返回 `false`
    pub async fn fire(&self, key: &JobKey) -> bool {
        let entry = {
            let mut jobs = self.jobs.lock();
            let Some((job, callback)) = jobs.get(key).cloned() else {
                return false;
            };
            if job.trigger().is_one_shot() {
                jobs.remove(key);
            }
            (job, callback)
        };
        let (job, callback) = entry;
        callback(job).await;
        true
    }

    pub fn job(&self, key: &JobKey) -> Option<ScheduledCommandJob> {
        self.jobs.lock().get(key).map(|(job, _)| job.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shut_down.lock()
    }
}

#[async_trait]
impl TriggerService for ManualTriggerService {
    async fn register(&self, job: ScheduledCommandJob, on_fire: JobCallback) -> AppResult<()> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(job.job_key()) {
            return Err(AppError::scheduler(format!(
                "job `{}` is already registered",
                job.job_key()
            )));
        }
        jobs.insert(job.job_key().clone(), (job, on_fire));
        Ok(())
    }

    async fn unregister(&self, job_key: &JobKey) -> AppResult<bool> {
        Ok(self.jobs.lock().remove(job_key).is_some())
    }

    async fn contains(&self, job_key: &JobKey) -> bool {
        self.jobs.lock().contains_key(job_key)
    }

    async fn shutdown(&self) -> AppResult<()> {
        *self.shut_down.lock() = true;
        Ok(())
    }
}
