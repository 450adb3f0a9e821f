//! 环境工作单元访问器（CurrentUnitOfWork）
//!
//! 以执行上下文（一次逻辑操作的异步调用链）为作用域保存当前工作单元，
//! 而非进程级全局变量：不同任务中的并发操作各自观察到独立的值。
//!
use super::unit_of_work::UnitOfWork;
use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult};
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

tokio::task_local! {
    static AMBIENT: RefCell<Option<Arc<UnitOfWork>>>;
}

/// 当前执行上下文中的环境工作单元
pub struct CurrentUnitOfWork;

impl CurrentUnitOfWork {
    /// 在新的执行上下文中运行 `fut`（环境工作单元初始为空）
    pub async fn scope<F>(fut: F) -> F::Output
    where
        F: Future,
    {
        AMBIENT.scope(RefCell::new(None), fut).await
    }

    /// 已处于某个执行上下文时复用它，否则新建一个
    pub async fn ensure_scope<F>(fut: F) -> F::Output
    where
        F: Future,
    {
        if Self::in_scope() {
            fut.await
        } else {
            Self::scope(fut).await
        }
    }

    /// 当前是否处于某个执行上下文中
    pub fn in_scope() -> bool {
        AMBIENT.try_with(|_| ()).is_ok()
    }

    /// 读取环境工作单元；未设置或不在执行上下文中时返回 `None`（不是错误）
    pub fn current() -> Option<Arc<UnitOfWork>> {
        AMBIENT.try_with(|slot| slot.borrow().clone()).ok().flatten()
    }

    /// 设置环境工作单元
    ///
    /// 当前上下文已有非终态的工作单元时返回 `AmbientConflict`；
    /// 不在执行上下文中时返回 `InvalidState`。
    pub fn set(uow: Arc<UnitOfWork>) -> DomainResult<()> {
        AMBIENT
            .try_with(|slot| {
                let mut slot = slot.borrow_mut();
                if let Some(active) = slot.as_ref() {
                    if !active.state().is_terminal() {
                        return Err(DomainError::AmbientConflict {
                            active: active.id().to_string(),
                        });
                    }
                }
                *slot = Some(uow);
                Ok(())
            })
            .map_err(|_| {
                DomainError::invalid_state(
                    "no execution scope: wrap the operation with CurrentUnitOfWork::scope",
                )
            })?
    }

    /// 清空环境工作单元；不在执行上下文中时为空操作
    pub fn clear() {
        let _ = AMBIENT.try_with(|slot| slot.borrow_mut().take());
    }

    // 仅当环境工作单元仍是 `id` 时才清空，避免误清后来者
    pub(crate) fn clear_if(id: Uuid) {
        let _ = AMBIENT.try_with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().map(|uow| uow.id()) == Some(id) {
                slot.take();
            }
        });
    }
}

/// 向环境工作单元提出领域事件
///
/// 没有环境工作单元（例如在查询处理器中）时返回 `InvalidState`。
pub fn raise_event<E>(event: &E) -> DomainResult<()>
where
    E: DomainEvent,
{
    let uow = CurrentUnitOfWork::current().ok_or_else(|| {
        DomainError::invalid_state(format!(
            "no ambient unit of work to raise {}",
            event.event_type()
        ))
    })?;
    uow.raise_event(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::BusinessContext;
    use crate::unit_of_work::{InMemoryResource, UnitOfWorkState};
    use std::time::Duration;

    #[tokio::test]
    async fn current_is_none_outside_scope_and_in_empty_scope() {
        assert!(CurrentUnitOfWork::current().is_none());
        assert!(!CurrentUnitOfWork::in_scope());
        CurrentUnitOfWork::scope(async {
            assert!(CurrentUnitOfWork::in_scope());
            assert!(CurrentUnitOfWork::current().is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn set_outside_scope_is_invalid_state() {
        let resource = InMemoryResource::new();
        let uow = CurrentUnitOfWork::scope(async {
            UnitOfWork::begin(&resource, BusinessContext::default())
                .await
                .unwrap()
        })
        .await;

        let err = CurrentUnitOfWork::set(uow).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn terminal_ambient_may_be_replaced() {
        let resource = InMemoryResource::new();
        CurrentUnitOfWork::scope(async {
            let first = UnitOfWork::begin(&resource, BusinessContext::default())
                .await
                .unwrap();
            first.commit().await.unwrap();
            assert_eq!(first.state(), UnitOfWorkState::Committed);

            let second = UnitOfWork::begin(&resource, BusinessContext::default())
                .await
                .unwrap();
            let current = CurrentUnitOfWork::current().unwrap();
            assert_eq!(current.id(), second.id());
            second.rollback().await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn raise_event_without_ambient_is_invalid_state() {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Ping {
            id: String,
        }
        impl DomainEvent for Ping {
            fn event_id(&self) -> &str {
                &self.id
            }
            fn event_type(&self) -> &str {
                "ping"
            }
            fn event_version(&self) -> usize {
                1
            }
        }

        let err = raise_event(&Ping { id: "p".into() }).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scopes_are_independent() {
        let resource = Arc::new(InMemoryResource::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resource = resource.clone();
            handles.push(tokio::spawn(CurrentUnitOfWork::scope(async move {
                let uow = UnitOfWork::begin(resource.as_ref(), BusinessContext::default())
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                let seen = CurrentUnitOfWork::current().unwrap();
                assert_eq!(seen.id(), uow.id());
                uow.commit().await.unwrap();
                uow.id()
            })));
        }

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        // 其它任务的设置不会泄漏到当前任务
        assert!(CurrentUnitOfWork::current().is_none());
    }
}
