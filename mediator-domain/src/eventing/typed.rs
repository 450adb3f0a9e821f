use super::handler::{EventHandler, HandledEventType};
use crate::domain_event::{DomainEvent, SerializedEvent};
use crate::error::DomainResult;
use async_trait::async_trait;
use std::marker::PhantomData;

/// 面向具体事件类型的处理器
#[async_trait]
pub trait DomainEventHandler<E>: Send + Sync
where
    E: DomainEvent,
{
    async fn handle(&self, event: E, meta: &SerializedEvent) -> DomainResult<()>;
}

/// 将 `DomainEventHandler<E>` 适配为 `EventHandler`：先还原负载，再交给具体处理器
pub struct TypedEventHandler<E, H> {
    name: String,
    handles: HandledEventType,
    inner: H,
    _event: PhantomData<fn(E)>,
}

impl<E, H> TypedEventHandler<E, H>
where
    E: DomainEvent,
    H: DomainEventHandler<E>,
{
    pub fn new(name: impl Into<String>, handles: HandledEventType, inner: H) -> Self {
        Self {
            name: name.into(),
            handles,
            inner,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<E, H> EventHandler for TypedEventHandler<E, H>
where
    E: DomainEvent,
    H: DomainEventHandler<E>,
{
    fn handler_name(&self) -> &str {
        &self.name
    }

    fn handled_event_type(&self) -> HandledEventType {
        self.handles.clone()
    }

    async fn handle(&self, event: &SerializedEvent) -> DomainResult<()> {
        let payload: E = event.payload_as()?;
        self.inner.handle(payload, event).await
    }
}
