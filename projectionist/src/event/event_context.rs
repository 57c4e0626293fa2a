//! 事件的业务上下文（EventContext）
//!
//! 反应器在处理事件时常会触发新的命令/事件，`caused_by` 用于沿用触发事件的
//! 关联 ID 并以其 event_id 作为因果 ID，使下游事件可追溯到源头。
//!
use super::StoredEvent;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Builder, Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// 关联 ID，同一业务操作链路上的事件共享
    #[builder(into)]
    correlation_id: Option<String>,
    /// 因果 ID，指向直接触发本事件的事件
    #[builder(into)]
    causation_id: Option<String>,
    #[builder(into)]
    actor_type: Option<String>,
    #[builder(into)]
    actor_id: Option<String>,
    /// 自定义扩展字段
    #[serde(skip_serializing_if = "Option::is_none")]
    extensions: Option<Value>,
}

impl EventContext {
    /// 由触发事件派生上下文
    ///
    /// 关联 ID 沿用触发事件的关联 ID（缺失时取其 event_id），因果 ID 为触发事件的 event_id，
    /// 主体信息原样继承。
    pub fn caused_by(trigger: &StoredEvent) -> Self {
        let correlation_id = trigger
            .correlation_id()
            .unwrap_or_else(|| trigger.event_id())
            .to_string();

        Self {
            correlation_id: Some(correlation_id),
            causation_id: Some(trigger.event_id().to_string()),
            actor_type: trigger.actor_type().map(str::to_string),
            actor_id: trigger.actor_id().map(str::to_string),
            extensions: None,
        }
    }

    /// 写入一个扩展字段；已存在的同名字段被覆盖
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = match self.extensions.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(key.into(), value.into());
        self.extensions = Some(Value::Object(map));
        self
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.as_ref()?.get(key)
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

    pub fn extensions(&self) -> Option<&Value> {
        self.extensions.as_ref()
    }
}
