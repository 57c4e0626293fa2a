//! 事件处理器（EventHandler）
//!
//! 处理器由两部分静态声明组成：
//! - `HandlerMethods`：方法表，列出可被调用的方法名，并按名称调用；
//!   通常由 `#[event_handler]` 宏从 impl 块生成。
//! - `EventHandler`：能力声明，包括角色、事件类型到方法名的映射、
//!   是否排队执行、排队标签与异常钩子。
//!
//! 处理器身份即其 Rust 类型（`HandlerId`），与构造参数无关。
//!
use crate::event::StoredEvent;
use async_trait::async_trait;
use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 处理器身份：以类型区分，同类型的不同实例视为同一注册项
#[derive(Clone, Copy, Debug)]
pub struct HandlerId {
    type_id: TypeId,
    name: &'static str,
}

impl HandlerId {
    pub fn of<H>() -> Self
    where
        H: ?Sized + 'static,
    {
        Self {
            type_id: TypeId::of::<H>(),
            name: type_name::<H>(),
        }
    }

    /// 完整类型名（形如 `my_app::projectors::BalanceProjector`）
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径的短类型名
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for HandlerId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for HandlerId {}

impl Hash for HandlerId {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) fn short_type_name(name: &str) -> &str {
    // 泛型参数中也可能含有 `::`，只截取参数列表之前的路径
    let path_end = name.find('<').unwrap_or(name.len());
    let start = name[..path_end].rfind("::").map(|i| i + 2).unwrap_or(0);
    &name[start..]
}

/// 处理器角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    /// 维护读模型
    Projector,
    /// 触发副作用（通知等），不维护可查询状态
    Reactor,
}

impl fmt::Display for HandlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projector => f.write_str("projector"),
            Self::Reactor => f.write_str("reactor"),
        }
    }
}

/// 事件类型到方法名的映射，同一事件类型只保留最后一次声明
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandledEvents {
    entries: Vec<(String, String)>,
}

impl HandledEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明：`event_type` 类型的事件交由 `method` 处理
    pub fn on(mut self, event_type: impl Into<String>, method: impl Into<String>) -> Self {
        let event_type = event_type.into();
        let method = method.into();
        match self.entries.iter_mut().find(|(t, _)| *t == event_type) {
            Some(entry) => entry.1 = method,
            None => self.entries.push((event_type, method)),
        }
        self
    }

    pub fn method_for(&self, event_type: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == event_type)
            .map(|(_, m)| m.as_str())
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 处理器方法表
#[async_trait]
pub trait HandlerMethods: Send + Sync {
    /// 可被路由调用的方法名
    fn method_names(&self) -> &'static [&'static str];

    /// 由方法上的事件类型标注推导出的映射（宏生成）；手写时可忽略
    fn declared_events(&self) -> HandledEvents {
        HandledEvents::new()
    }

    /// 按名称调用方法
    async fn call_method(&self, method: &str, event: &StoredEvent) -> anyhow::Result<()>;

    fn has_method(&self, method: &str) -> bool {
        self.method_names().contains(&method)
    }
}

/// 事件处理器：声明关心的事件类型与执行方式
#[async_trait]
pub trait EventHandler: HandlerMethods + 'static {
    /// `add_event_handler` 依据角色决定放入哪个集合
    fn role(&self) -> HandlerRole;

    /// 事件类型到方法名的映射；为空表示忽略所有事件
    fn handled_events(&self) -> HandledEvents {
        self.declared_events()
    }

    /// 未命中映射时调用的方法；默认不处理
    fn fallback_method(&self) -> Option<&str> {
        None
    }

    /// 是否交由异步 worker 执行
    fn is_queued(&self) -> bool {
        false
    }

    /// 排队执行时附加到工作项上的标签
    fn tags(&self, _event: &StoredEvent) -> Vec<String> {
        Vec::new()
    }

    /// catch 模式下本处理器失败后的回调；其自身的失败不再被捕获
    async fn on_handler_exception(
        &self,
        _event: &StoredEvent,
        _error: &anyhow::Error,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
