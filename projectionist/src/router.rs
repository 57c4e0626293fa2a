//! 事件路由（EventRouter）
//!
//! 对给定的处理器与事件，解析出零个或一个需要调用的方法。
//!
use crate::error::{ProjectionistError, ProjectionistResult};
use crate::event::StoredEvent;
use crate::handler::{EventHandler, HandledEvents, HandlerId, short_type_name};
use crate::registry::RegisteredHandler;
use std::any::type_name;

/// 一次分发步骤：事件、处理器与解析出的方法，仅在单次分发过程中存在
#[derive(Debug)]
pub struct DispatchRecord<'a> {
    pub event: &'a StoredEvent,
    pub handler: &'a RegisteredHandler,
    pub method: String,
}

impl DispatchRecord<'_> {
    pub fn handler_id(&self) -> HandlerId {
        self.handler.id()
    }
}

pub struct EventRouter;

impl EventRouter {
    /// 解析处理器针对该事件应调用的方法
    ///
    /// - 映射命中：返回映射的方法名；
    /// - 未命中：若声明了 fallback 则返回之，否则返回 `None`（常见情况，不是错误）；
    /// - 解析出的方法不在方法表中：返回 `InvalidEventHandler`。
    pub fn resolve<H>(handler: &H, event: &StoredEvent) -> ProjectionistResult<Option<String>>
    where
        H: EventHandler + ?Sized,
    {
        let handled = handler.handled_events();
        Self::resolve_named(handler, &handled, short_type_name(type_name::<H>()), event)
    }

    /// 针对注册项解析，并生成分发记录；使用注册时缓存的事件映射
    pub fn route<'a>(
        entry: &'a RegisteredHandler,
        event: &'a StoredEvent,
    ) -> ProjectionistResult<Option<DispatchRecord<'a>>> {
        let method = Self::resolve_named(
            entry.handler(),
            entry.handled_events(),
            entry.id().short_name(),
            event,
        )?;

        Ok(method.map(|method| DispatchRecord {
            event,
            handler: entry,
            method,
        }))
    }

    fn resolve_named<H>(
        handler: &H,
        handled: &HandledEvents,
        name: &str,
        event: &StoredEvent,
    ) -> ProjectionistResult<Option<String>>
    where
        H: EventHandler + ?Sized,
    {
        let method = match handled.method_for(event.event_type()) {
            Some(method) => method.to_string(),
            None => match handler.fallback_method() {
                Some(fallback) => fallback.to_string(),
                None => return Ok(None),
            },
        };

        if !handler.has_method(&method) {
            return Err(ProjectionistError::InvalidEventHandler {
                handler: name.to_string(),
                event_type: event.event_type().to_string(),
                method,
            });
        }

        Ok(Some(method))
    }
}
