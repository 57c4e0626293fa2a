//! 分发用的事件信封（StoredEvent）
//!
//! 由外部事件源（事件存储、聚合根等）产生，分发核心只读不写。
//! `event_type` 是路由键；载荷以 JSON 保存，处理器按需还原为类型化事件。
//!
use super::{DomainEvent, EventContext};
use crate::error::ProjectionistResult;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct StoredEvent {
    /// 事件唯一标识符
    #[builder(into, default = Uuid::new_v4().to_string())]
    event_id: String,
    /// 事件类型，用于路由到处理器方法
    #[builder(into)]
    event_type: String,
    /// 事件版本
    #[builder(default = 1)]
    event_version: usize,
    /// 全局事件位点，由存储层在持久化后赋值
    sequence_number: Option<i64>,
    /// 聚合 ID
    #[builder(into)]
    aggregate_id: Option<String>,
    /// 聚合类型
    #[builder(into)]
    aggregate_type: Option<String>,
    /// 聚合版本
    aggregate_version: Option<usize>,
    /// 关联 ID，用于将多个事件关联到同一个业务操作
    #[builder(into)]
    correlation_id: Option<String>,
    /// 因果 ID，用于表示事件的触发来源
    #[builder(into)]
    causation_id: Option<String>,
    /// 触发事件的主体类型（如用户、系统等）
    #[builder(into)]
    actor_type: Option<String>,
    /// 触发事件的主体 ID
    #[builder(into)]
    actor_id: Option<String>,
    /// 事件发生时间
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
    /// 事件负载
    #[builder(default)]
    payload: Value,
    /// 业务上下文信息
    #[builder(default)]
    context: Value,
}

impl StoredEvent {
    /// 将类型化事件与业务上下文封装为信封
    pub fn from_domain_event<E>(event: &E, context: &EventContext) -> ProjectionistResult<Self>
    where
        E: DomainEvent,
    {
        Ok(Self::builder()
            .event_type(event.event_type())
            .event_version(event.event_version())
            .maybe_correlation_id(context.correlation_id())
            .maybe_causation_id(context.causation_id())
            .maybe_actor_type(context.actor_type())
            .maybe_actor_id(context.actor_id())
            .payload(serde_json::to_value(event)?)
            .context(serde_json::to_value(context)?)
            .build())
    }

    /// 将载荷还原为类型化事件
    pub fn payload_as<E>(&self) -> ProjectionistResult<E>
    where
        E: DeserializeOwned,
    {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// 还原业务上下文；缺失或为空时返回默认值
    pub fn event_context(&self) -> ProjectionistResult<EventContext> {
        if self.context.is_null() {
            return Ok(EventContext::default());
        }
        Ok(serde_json::from_value(self.context.clone())?)
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

    pub fn sequence_number(&self) -> Option<i64> {
        self.sequence_number
    }

    pub fn aggregate_id(&self) -> Option<&str> {
        self.aggregate_id.as_deref()
    }

    pub fn aggregate_type(&self) -> Option<&str> {
        self.aggregate_type.as_deref()
    }

    pub fn aggregate_version(&self) -> Option<usize> {
        self.aggregate_version
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_type(&self) -> Option<&str> {
        self.actor_type.as_deref()
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

    pub fn context(&self) -> &Value {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum AccountEvent {
        MoneyAdded { account_id: u64, amount: i64 },
    }

    impl DomainEvent for AccountEvent {
        fn event_type(&self) -> &str {
            match self {
                Self::MoneyAdded { .. } => "MoneyAdded",
            }
        }

        fn event_version(&self) -> usize {
            2
        }
    }

    #[test]
    fn wraps_domain_event_with_context() {
        let event = AccountEvent::MoneyAdded {
            account_id: 42,
            amount: 500,
        };
        let context = EventContext::builder()
            .correlation_id("cor-1")
            .causation_id("cau-1")
            .actor_type("user")
            .actor_id("u-1")
            .build();

        let stored = StoredEvent::from_domain_event(&event, &context).unwrap();

        assert_eq!(stored.event_type(), "MoneyAdded");
        assert_eq!(stored.event_version(), 2);
        assert_eq!(stored.correlation_id(), Some("cor-1"));
        assert_eq!(stored.actor_id(), Some("u-1"));
        assert!(!stored.event_id().is_empty());
        assert_eq!(stored.payload_as::<AccountEvent>().unwrap(), event);
        assert_eq!(stored.event_context().unwrap(), context);
    }

    #[test]
    fn builder_defaults() {
        let stored = StoredEvent::builder().event_type("Ping").build();

        assert_eq!(stored.event_version(), 1);
        assert!(stored.payload().is_null());
        assert!(stored.aggregate_id().is_none());
        assert_eq!(stored.event_context().unwrap(), EventContext::default());
    }

    #[test]
    fn payload_type_mismatch_is_serde_error() {
        let stored = StoredEvent::builder()
            .event_type("MoneyAdded")
            .payload(serde_json::json!({"unexpected": true}))
            .build();

        let err = stored.payload_as::<AccountEvent>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::ProjectionistError::Serde { .. }
        ));
    }
}
