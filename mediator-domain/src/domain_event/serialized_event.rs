//! 事件的排队/分发形态（SerializedEvent）
//!
//! 事件在工作单元中以序列化后的标准形态排队：提出时即完成序列化，
//! 保证事件在提出之后不可变，且提交后可直接交给分发器或外部投递。
//!
use super::{BusinessContext, DomainEvent};
use crate::error::DomainResult;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 事件唯一标识符
    event_id: String,
    /// 事件类型，用于匹配处理器
    event_type: String,
    /// 事件版本
    event_version: usize,
    /// 关联 ID，用于将多个事件关联到同一个业务操作
    correlation_id: Option<String>,
    /// 因果 ID，用于表示事件的触发来源
    causation_id: Option<String>,
    /// 触发事件的主体 ID
    actor_id: Option<String>,
    /// 事件发生时间
    occurred_at: DateTime<Utc>,
    /// 事件负载
    payload: Value,
}

impl SerializedEvent {
    /// 将领域事件与当前业务语境封装为排队形态
    pub fn from_event<E>(event: &E, biz: &BusinessContext) -> Result<Self, serde_json::Error>
    where
        E: DomainEvent,
    {
        Ok(SerializedEvent {
            event_id: event.event_id().to_string(),
            event_type: event.event_type().to_string(),
            event_version: event.event_version(),
            correlation_id: biz.correlation_id().map(|s| s.to_string()),
            causation_id: biz.causation_id().map(|s| s.to_string()),
            actor_id: biz.actor_id().map(|s| s.to_string()),
            occurred_at: Utc::now(),
            payload: serde_json::to_value(event)?,
        })
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> usize {
        self.event_version
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 将负载还原为具体的事件类型
    pub fn payload_as<E>(&self) -> DomainResult<E>
    where
        E: DeserializeOwned,
    {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shipped {
        id: String,
        order_id: u64,
    }

    impl DomainEvent for Shipped {
        fn event_id(&self) -> &str {
            &self.id
        }
        fn event_type(&self) -> &str {
            "order.shipped"
        }
        fn event_version(&self) -> usize {
            2
        }
    }

    #[test]
    fn from_event_captures_metadata_and_context() {
        let biz = BusinessContext::builder()
            .correlation_id("cor-9".to_string())
            .causation_id("cau-9".to_string())
            .actor_id("u-1".to_string())
            .build();
        let ev = Shipped {
            id: "e-1".into(),
            order_id: 7,
        };

        let se = SerializedEvent::from_event(&ev, &biz).unwrap();

        assert_eq!(se.event_id(), "e-1");
        assert_eq!(se.event_type(), "order.shipped");
        assert_eq!(se.event_version(), 2);
        assert_eq!(se.correlation_id(), Some("cor-9"));
        assert_eq!(se.causation_id(), Some("cau-9"));
        assert_eq!(se.actor_id(), Some("u-1"));
        assert_eq!(se.payload_as::<Shipped>().unwrap(), ev);
    }

    #[test]
    fn payload_as_wrong_type_is_serde_error() {
        let se = SerializedEvent::builder()
            .event_id("e-2".to_string())
            .event_type("order.shipped".to_string())
            .event_version(1)
            .occurred_at(Utc::now())
            .payload(serde_json::json!({"unexpected": true}))
            .build();

        let err = se.payload_as::<Shipped>().unwrap_err();
        assert!(matches!(err, DomainError::Serde { .. }));
    }
}
