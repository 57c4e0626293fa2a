//! 内存版处理器队列（InMemoryHandlerQueue）
//!
//! 基于有界 `tokio::sync::mpsc` 实现：
//! - `enqueue`：非阻塞提交（`try_send`），队列满或已关闭时返回 `Queue` 错误；
//! - `subscribe`：取出唯一的消费端，返回 `'static` 生命周期的工作项流，便于在 `tokio::spawn` 中使用；
//! - 典型用途：测试环境、示例与本地开发。
//!
use super::{HandlerQueue, QueuedWorkItem};
use crate::error::{ProjectionistError, ProjectionistResult as Result};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

#[derive(Clone)]
pub struct InMemoryHandlerQueue {
    tx: mpsc::Sender<QueuedWorkItem>,
    rx: Arc<Mutex<Option<mpsc::Receiver<QueuedWorkItem>>>>,
}

impl InMemoryHandlerQueue {
    /// 创建一个内存队列，`capacity` 为缓冲区容量，最小为 1
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// 取出消费端；只能调用一次
    pub fn subscribe(&self) -> Result<BoxStream<'static, QueuedWorkItem>> {
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ProjectionistError::queue("queue already subscribed"))?;
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// 当前缓冲中尚未被消费的工作项数
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

#[async_trait]
impl HandlerQueue for InMemoryHandlerQueue {
    async fn enqueue(&self, item: QueuedWorkItem) -> Result<()> {
        debug!(
            handler = %item.handler(),
            method = %item.method(),
            tags = ?item.tags(),
            "enqueue work item"
        );
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(_) => ProjectionistError::queue("queue is full"),
            TrySendError::Closed(_) => ProjectionistError::queue("queue is closed"),
        })
    }
}
