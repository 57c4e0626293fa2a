//! 异步执行协作方（queue）
//!
//! 排队执行的处理器在分发时被封装为 `QueuedWorkItem` 提交给 `HandlerQueue`；
//! 队列负责最终在 worker 上调用解析出的方法，并保证至少一次投递。
//!
//! 本模块仅定义协议；`queue` 特性下另提供内存实现与后台 worker，
//! 适用于测试、示例与本地开发。
//!
use crate::error::ProjectionistResult;
use crate::event::StoredEvent;
use crate::handler::HandlerId;
use async_trait::async_trait;

#[cfg(feature = "queue")]
mod inmemory;
#[cfg(feature = "queue")]
mod worker;

#[cfg(feature = "queue")]
pub use inmemory::InMemoryHandlerQueue;
#[cfg(feature = "queue")]
pub use worker::{QueueWorker, WorkerHandle, WorkerStats};

/// 延迟执行的工作项
#[derive(Clone, Debug)]
pub struct QueuedWorkItem {
    event: StoredEvent,
    handler: HandlerId,
    method: String,
    tags: Vec<String>,
    queue: Option<String>,
}

impl QueuedWorkItem {
    pub fn new(
        event: StoredEvent,
        handler: HandlerId,
        method: impl Into<String>,
        tags: Vec<String>,
        queue: Option<String>,
    ) -> Self {
        Self {
            event,
            handler,
            method: method.into(),
            tags,
            queue,
        }
    }

    pub fn event(&self) -> &StoredEvent {
        &self.event
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// 用于监控/筛选的标签
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// 目标队列名；为空时由队列实现决定
    pub fn queue(&self) -> Option<&str> {
        self.queue.as_deref()
    }
}

/// 处理器队列：接收延迟执行的工作项
#[async_trait]
pub trait HandlerQueue: Send + Sync {
    /// 提交工作项；应尽快返回，不等待执行
    async fn enqueue(&self, item: QueuedWorkItem) -> ProjectionistResult<()>;
}
