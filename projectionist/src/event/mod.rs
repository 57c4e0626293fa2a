//! 事件（Event）
//!
//! 定义类型化事件载荷需要实现的最小接口（`DomainEvent`），事件的业务上下文
//! （`EventContext`），以及分发核心实际处理的不可变事件信封（`StoredEvent`）。

mod domain_event_trait;
mod event_context;
mod stored_event;

pub use domain_event_trait::DomainEvent;
pub use event_context::EventContext;
pub use stored_event::StoredEvent;
