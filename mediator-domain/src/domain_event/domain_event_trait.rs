use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 事件一经提出即不可变；在所属工作单元提交成功前不会被分发。
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 事件唯一标识
    fn event_id(&self) -> &str;

    /// 事件类型（形如 `OrderEvent.Created` 或自定义类型名），用于匹配事件处理器
    fn event_type(&self) -> &str;

    /// 事件载荷版本
    fn event_version(&self) -> usize;
}
