//! 处理器注册表（HandlerRegistry）与类型目录（HandlerCatalog）
//!
//! 注册表持有两个相互独立、按插入顺序排列且按身份去重的集合：投影器与反应器。
//! 插入顺序即分发顺序。重复注册同一身份是无操作，而非错误。
//!
//! 目录用于“按类型名注册”：类型需预先登记构造方式，未知类型名返回
//! `ProjectionistError::Resolution`。
//!
use crate::error::{ProjectionistError, ProjectionistResult};
use crate::handler::{EventHandler, HandledEvents, HandlerId, HandlerRole};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// 已注册的处理器：身份 + 共享实例 + 注册时取得的事件映射
#[derive(Clone)]
pub struct RegisteredHandler {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
    handled_events: Arc<HandledEvents>,
}

impl RegisteredHandler {
    pub fn new<H>(handler: H) -> Self
    where
        H: EventHandler,
    {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc<H>(handler: Arc<H>) -> Self
    where
        H: EventHandler,
    {
        let handled_events = Arc::new(handler.handled_events());
        Self {
            id: HandlerId::of::<H>(),
            handler,
            handled_events,
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn handler(&self) -> &dyn EventHandler {
        self.handler.as_ref()
    }

    pub fn role(&self) -> HandlerRole {
        self.handler.role()
    }

    /// 事件映射在构造时计算一次，分发期间不再重建
    pub fn handled_events(&self) -> &HandledEvents {
        &self.handled_events
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("id", &self.id.name())
            .field("role", &self.handler.role())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct HandlerRegistry {
    projectors: Vec<RegisteredHandler>,
    reactors: Vec<RegisteredHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册投影器；已存在同身份时返回 false
    pub fn add_projector(&mut self, entry: RegisteredHandler) -> bool {
        Self::insert(&mut self.projectors, entry)
    }

    /// 注册反应器；已存在同身份时返回 false
    pub fn add_reactor(&mut self, entry: RegisteredHandler) -> bool {
        Self::insert(&mut self.reactors, entry)
    }

    /// 依据处理器自身声明的角色注册
    pub fn add_event_handler(&mut self, entry: RegisteredHandler) -> bool {
        match entry.role() {
            HandlerRole::Projector => self.add_projector(entry),
            HandlerRole::Reactor => self.add_reactor(entry),
        }
    }

    pub fn projectors(&self) -> &[RegisteredHandler] {
        &self.projectors
    }

    pub fn reactors(&self) -> &[RegisteredHandler] {
        &self.reactors
    }

    /// 分发顺序：先投影器，后反应器，各自按注册顺序
    pub fn dispatch_order(&self) -> impl Iterator<Item = &RegisteredHandler> {
        self.projectors.iter().chain(self.reactors.iter())
    }

    pub fn find(&self, id: &HandlerId) -> Option<&RegisteredHandler> {
        self.dispatch_order().find(|h| h.id == *id)
    }

    pub fn contains(&self, id: &HandlerId) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.projectors.len() + self.reactors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectors.is_empty() && self.reactors.is_empty()
    }

    /// 从所在集合中移除单个处理器；不存在时无操作
    pub fn without_event_handler(&mut self, id: &HandlerId) {
        self.projectors.retain(|h| h.id != *id);
        self.reactors.retain(|h| h.id != *id);
    }

    /// `Some(ids)` 从两个集合中移除指定处理器；`None` 清空两个集合
    pub fn without_event_handlers(&mut self, ids: Option<&[HandlerId]>) {
        self.without_projectors(ids);
        self.without_reactors(ids);
    }

    pub fn without_projectors(&mut self, ids: Option<&[HandlerId]>) {
        Self::remove(&mut self.projectors, ids);
    }

    pub fn without_reactors(&mut self, ids: Option<&[HandlerId]>) {
        Self::remove(&mut self.reactors, ids);
    }

    fn insert(set: &mut Vec<RegisteredHandler>, entry: RegisteredHandler) -> bool {
        if set.iter().any(|h| h.id == entry.id) {
            return false;
        }
        set.push(entry);
        true
    }

    fn remove(set: &mut Vec<RegisteredHandler>, ids: Option<&[HandlerId]>) {
        match ids {
            Some(ids) => set.retain(|h| !ids.contains(&h.id)),
            None => set.clear(),
        }
    }
}

type HandlerFactory = Arc<dyn Fn() -> RegisteredHandler + Send + Sync>;

/// 处理器类型目录：按类型名构造默认实例
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    entries: Vec<(HandlerId, HandlerFactory)>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记可用 `Default` 构造的处理器类型
    pub fn register<H>(self) -> Self
    where
        H: EventHandler + Default,
    {
        self.register_with(H::default)
    }

    /// 登记处理器类型及其构造方式
    pub fn register_with<H, F>(mut self, factory: F) -> Self
    where
        H: EventHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let id = HandlerId::of::<H>();
        let factory: HandlerFactory = Arc::new(move || RegisteredHandler::new(factory()));
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.push((id, factory));
        self
    }

    /// 按完整类型名或短类型名解析并构造处理器
    ///
    /// 短类型名同时对应多个已登记类型时视为无法解析，须改用完整类型名。
    pub fn resolve(&self, name: &str) -> ProjectionistResult<RegisteredHandler> {
        if let Some((_, factory)) = self.entries.iter().find(|(id, _)| id.name() == name) {
            return Ok(factory());
        }

        let mut candidates = self.entries.iter().filter(|(id, _)| id.short_name() == name);
        match (candidates.next(), candidates.next()) {
            (Some((_, factory)), None) => Ok(factory()),
            (Some(_), Some(_)) => {
                warn!(
                    name,
                    candidates = ?self.entries
                        .iter()
                        .filter(|(id, _)| id.short_name() == name)
                        .map(|(id, _)| id.name())
                        .collect::<Vec<_>>(),
                    "ambiguous event handler name, use the full type name"
                );
                Err(ProjectionistError::resolution(name))
            }
            _ => Err(ProjectionistError::resolution(name)),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| id.name()).collect()
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("handlers", &self.names())
            .finish()
    }
}
