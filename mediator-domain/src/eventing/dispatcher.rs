//! 领域事件分发器（DomainEventsDispatcher）
//!
//! 在工作单元提交之后调用：
//! - 按事件提出顺序逐个分发；
//! - 每个事件按注册顺序调用所有匹配的处理器；
//! - 单个处理器失败只记录，不影响其余处理器与后续事件；
//! - 失败汇总后写入日志并以 `DispatchReport` 返回，绝不静默丢弃。
//!
use super::{EventHandler, HandledEventType};
use crate::domain_event::SerializedEvent;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// 单次处理器失败记录
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerFailure {
    pub handler: String,
    pub event_id: String,
    pub event_type: String,
    pub reason: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler={} event={}({}) reason={}",
            self.handler, self.event_type, self.event_id, self.reason
        )
    }
}

/// 一次分发的汇总结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 参与分发的事件数
    pub events: usize,
    /// 处理器被调用的总次数
    pub invocations: usize,
    /// 失败明细（按发生顺序）
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
struct HandlerRegistry {
    // 保持注册顺序
    entries: Vec<(HandledEventType, Arc<dyn EventHandler>)>,
}

impl HandlerRegistry {
    fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        let entries = handlers
            .into_iter()
            .map(|h| (h.handled_event_type(), h))
            .collect();
        Self { entries }
    }

    fn matching<'a>(
        &'a self,
        event_type: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn EventHandler>> {
        self.entries
            .iter()
            .filter(move |(types, _)| types.matches(event_type))
            .map(|(_, h)| h)
    }
}

/// 提交后事件分发器
#[derive(Clone, Default)]
pub struct DomainEventsDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl DomainEventsDispatcher {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new(handlers)),
        }
    }

    /// 已注册的处理器名称（按注册顺序）
    pub fn handler_names(&self) -> Vec<String> {
        self.registry
            .entries
            .iter()
            .map(|(_, h)| h.handler_name().to_string())
            .collect()
    }

    /// 分发一批已提交的事件
    pub async fn dispatch(&self, events: &[SerializedEvent]) -> DispatchReport {
        let mut report = DispatchReport {
            events: events.len(),
            ..Default::default()
        };
        if events.is_empty() {
            return report;
        }

        let started = Instant::now();
        for event in events {
            for handler in self.registry.matching(event.event_type()) {
                report.invocations += 1;
                if let Err(err) = handler.handle(event).await {
                    let failure = HandlerFailure {
                        handler: handler.handler_name().to_string(),
                        event_id: event.event_id().to_string(),
                        event_type: event.event_type().to_string(),
                        reason: err.to_string(),
                    };
                    tracing::error!(
                        handler = %failure.handler,
                        event_id = %failure.event_id,
                        event_type = %failure.event_type,
                        correlation_id = ?event.correlation_id(),
                        error = %failure.reason,
                        "domain event handler failed"
                    );
                    report.failures.push(failure);
                }
            }
        }

        if report.is_clean() {
            tracing::debug!(
                events = report.events,
                invocations = report.invocations,
                duration.ms = started.elapsed().as_millis() as u64,
                "domain events dispatched"
            );
        } else {
            tracing::warn!(
                events = report.events,
                invocations = report.invocations,
                failures = report.failures.len(),
                duration.ms = started.elapsed().as_millis() as u64,
                "domain events dispatched with handler failures"
            );
        }
        report
    }
}
