use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 类型化事件载荷需要满足的通用能力边界
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// 事件类型（形如 `AccountEvent.MoneyAdded` 或自定义类型名），即路由键
    fn event_type(&self) -> &str;

    /// 事件载荷版本
    fn event_version(&self) -> usize;
}
