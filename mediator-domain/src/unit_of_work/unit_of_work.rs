use super::current::CurrentUnitOfWork;
use super::resource::{Transaction, TransactionalResource};
use crate::domain_event::{BusinessContext, DomainEvent, SerializedEvent};
use crate::error::{DomainError, DomainResult};
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use uuid::Uuid;

/// 工作单元状态：`Active` 为唯一非终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Active,
    Committed,
    RolledBack,
}

impl UnitOfWorkState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

struct Core {
    state: UnitOfWorkState,
    // 提交进行中：不再接受新事件，也不允许并发回滚
    committing: bool,
    pending: Vec<SerializedEvent>,
}

/// 工作单元上下文
///
/// - 独占持有一个事务句柄，直至提交或回滚；
/// - 按提出顺序（FIFO）缓存待分发的领域事件；
/// - 提交成功时交出事件队列，其余任何结局都会丢弃事件。
pub struct UnitOfWork {
    id: Uuid,
    biz: BusinessContext,
    core: Mutex<Core>,
    transaction: AsyncMutex<Option<Box<dyn Transaction>>>,
}

impl UnitOfWork {
    /// 以已获取的事务句柄创建工作单元（不设置为环境工作单元）
    pub fn new(transaction: Box<dyn Transaction>, biz: BusinessContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            biz,
            core: Mutex::new(Core {
                state: UnitOfWorkState::Active,
                committing: false,
                pending: Vec::new(),
            }),
            transaction: AsyncMutex::new(Some(transaction)),
        }
    }

    /// 开始工作单元：获取事务资源并设置为当前执行上下文的环境工作单元
    ///
    /// - 已有活动的环境工作单元：`AmbientConflict`（不支持嵌套）；
    /// - 事务资源获取失败：`ResourceUnavailable`。
    pub async fn begin(
        resource: &dyn TransactionalResource,
        biz: BusinessContext,
    ) -> DomainResult<Arc<Self>> {
        if let Some(active) = CurrentUnitOfWork::current() {
            if !active.state().is_terminal() {
                return Err(DomainError::AmbientConflict {
                    active: active.id().to_string(),
                });
            }
        }

        let transaction = resource.begin().await.map_err(|err| match err {
            DomainError::ResourceUnavailable { .. } => err,
            other => DomainError::resource_unavailable(other.to_string()),
        })?;

        let uow = Arc::new(Self::new(transaction, biz));
        if let Err(err) = CurrentUnitOfWork::set(uow.clone()) {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!(uow.id = %uow.id, error = %rollback_err, "rollback after failed begin");
            }
            return Err(err);
        }

        tracing::debug!(uow.id = %uow.id, correlation_id = ?uow.biz.correlation_id(), "unit of work begun");
        Ok(uow)
    }

    /// 同 [`begin`](Self::begin)，但返回作用域守卫，离开作用域时保证释放
    pub async fn begin_scoped(
        resource: &dyn TransactionalResource,
        biz: BusinessContext,
    ) -> DomainResult<UnitOfWorkScope> {
        let uow = Self::begin(resource, biz).await?;
        Ok(UnitOfWorkScope { uow })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.core.lock().state
    }

    pub fn business_context(&self) -> &BusinessContext {
        &self.biz
    }

    /// 当前排队中的事件数量
    pub fn pending_events(&self) -> usize {
        self.core.lock().pending.len()
    }

    /// 提出领域事件：序列化后追加到待分发队列
    pub fn raise_event<E>(&self, event: &E) -> DomainResult<()>
    where
        E: DomainEvent,
    {
        let serialized = SerializedEvent::from_event(event, &self.biz)?;
        self.raise_serialized(serialized)
    }

    /// 追加一个已序列化的事件；仅在 `Active` 状态下有效
    pub fn raise_serialized(&self, event: SerializedEvent) -> DomainResult<()> {
        let mut core = self.core.lock();
        if core.state.is_terminal() || core.committing {
            return Err(DomainError::invalid_state(format!(
                "cannot raise event {} on unit of work {} in state {:?}",
                event.event_type(),
                self.id,
                core.state
            )));
        }
        core.pending.push(event);
        Ok(())
    }

    /// 以具体类型借用事务句柄（处理器读写存储时使用）
    pub async fn transaction<T>(&self) -> DomainResult<MappedMutexGuard<'_, T>>
    where
        T: Transaction,
    {
        if self.state().is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "unit of work {} is no longer active",
                self.id
            )));
        }

        let guard = self.transaction.lock().await;
        MutexGuard::try_map(guard, |slot| {
            slot.as_mut()
                .and_then(|tx| tx.as_any_mut().downcast_mut::<T>())
        })
        .map_err(|_| {
            DomainError::invalid_state(format!(
                "transaction of unit of work {} is not a {}",
                self.id,
                type_name::<T>()
            ))
        })
    }

    /// 提交：成功时转为 `Committed` 并按提出顺序返回事件；失败时转为 `RolledBack`
    /// 并丢弃事件，错误原样返回（不重试）。
    pub async fn commit(&self) -> DomainResult<Vec<SerializedEvent>> {
        {
            let mut core = self.core.lock();
            if core.state.is_terminal() || core.committing {
                return Err(DomainError::invalid_state(format!(
                    "cannot commit unit of work {} in state {:?}",
                    self.id, core.state
                )));
            }
            core.committing = true;
        }

        let transaction = self.transaction.lock().await.take();
        let outcome = match transaction {
            Some(tx) => tx.commit().await,
            None => Err(DomainError::invalid_state(format!(
                "transaction of unit of work {} was already released",
                self.id
            ))),
        };

        let mut core = self.core.lock();
        core.committing = false;
        match outcome {
            Ok(()) => {
                core.state = UnitOfWorkState::Committed;
                let events = std::mem::take(&mut core.pending);
                tracing::debug!(uow.id = %self.id, events = events.len(), "unit of work committed");
                Ok(events)
            }
            Err(err) => {
                core.state = UnitOfWorkState::RolledBack;
                core.pending.clear();
                tracing::warn!(uow.id = %self.id, error = %err, "commit failed, unit of work rolled back");
                Err(err)
            }
        }
    }

    /// 显式回滚：转为 `RolledBack`，丢弃待分发事件；对终态工作单元为空操作
    pub async fn rollback(&self) -> DomainResult<()> {
        {
            let mut core = self.core.lock();
            if core.state.is_terminal() {
                return Ok(());
            }
            if core.committing {
                return Err(DomainError::invalid_state(format!(
                    "commit of unit of work {} is in progress",
                    self.id
                )));
            }
            core.state = UnitOfWorkState::RolledBack;
            core.pending.clear();
        }

        let transaction = self.transaction.lock().await.take();
        if let Some(tx) = transaction {
            tx.rollback().await?;
        }
        tracing::debug!(uow.id = %self.id, "unit of work rolled back");
        Ok(())
    }

    // 同步放弃：用于 Drop 路径（处理器 panic、调用方取消等）
    fn abandon(&self) {
        {
            let mut core = self.core.lock();
            if core.state.is_terminal() {
                return;
            }
            core.state = UnitOfWorkState::RolledBack;
            core.committing = false;
            core.pending.clear();
        }

        let transaction = match self.transaction.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        if let Some(tx) = transaction {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let id = self.id;
                    handle.spawn(async move {
                        if let Err(err) = tx.rollback().await {
                            tracing::error!(uow.id = %id, error = %err, "rollback of abandoned unit of work failed");
                        }
                    });
                }
                // 无运行时：直接释放句柄，由存储侧在连接回收时回滚
                Err(_) => drop(tx),
            }
        }

        tracing::warn!(uow.id = %self.id, "unit of work released while active, rolled back");
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.abandon();
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.lock();
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("state", &core.state)
            .field("pending", &core.pending.len())
            .finish()
    }
}

/// 工作单元作用域守卫
///
/// 离开作用域时：清理当前执行上下文的环境工作单元；若仍为 `Active`，则回滚。
pub struct UnitOfWorkScope {
    uow: Arc<UnitOfWork>,
}

impl UnitOfWorkScope {
    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.uow
    }

    pub async fn commit(self) -> DomainResult<Vec<SerializedEvent>> {
        self.uow.commit().await
    }

    pub async fn rollback(self) -> DomainResult<()> {
        self.uow.rollback().await
    }
}

impl Deref for UnitOfWorkScope {
    type Target = UnitOfWork;

    fn deref(&self) -> &Self::Target {
        &self.uow
    }
}

impl Drop for UnitOfWorkScope {
    fn drop(&mut self) {
        CurrentUnitOfWork::clear_if(self.uow.id());
        self.uow.abandon();
    }
}
