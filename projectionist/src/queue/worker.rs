//! 队列 worker（QueueWorker）
//!
//! 消费工作项流，按处理器身份在注册表中重新解析处理器并调用方法。
//! 处理器在入队后被移除的工作项记为 orphaned，不视为失败。
//!
use super::QueuedWorkItem;
use crate::policy::HandlerOutcome;
use crate::executor::Projectionist;
use futures_core::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct QueueWorker {
    projectionist: Arc<Projectionist>,
    items: BoxStream<'static, QueuedWorkItem>,
}

impl QueueWorker {
    pub fn new(projectionist: Arc<Projectionist>, items: BoxStream<'static, QueuedWorkItem>) -> Self {
        Self {
            projectionist,
            items,
        }
    }

    /// 启动后台消费任务，返回可用于关闭/等待的句柄
    pub fn start(self) -> WorkerHandle {
        let token = CancellationToken::new();
        let stats = Arc::new(WorkerStats::default());

        let task = tokio::spawn(Self::run(self, token.clone(), stats.clone()));

        WorkerHandle {
            token,
            task: Some(task),
            stats,
        }
    }

    async fn run(self, token: CancellationToken, stats: Arc<WorkerStats>) {
        let Self {
            projectionist,
            mut items,
        } = self;

        loop {
            let maybe_item = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    Self::discard_buffered(&mut items, &stats);
                    break;
                }
                maybe_item = items.next() => maybe_item,
            };

            match maybe_item {
                Some(item) => Self::process(&projectionist, &item, &stats).await,
                None => break,
            }
        }
    }

    // 关闭时丢弃已缓冲但未执行的工作项
    fn discard_buffered(items: &mut BoxStream<'static, QueuedWorkItem>, stats: &WorkerStats) {
        let mut dropped = 0;
        while let Some(Some(item)) = items.next().now_or_never() {
            debug!(
                handler = %item.handler(),
                method = %item.method(),
                event_id = %item.event().event_id(),
                "discarding buffered work item on shutdown"
            );
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "worker shut down with buffered work items");
            stats.dropped.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    async fn process(projectionist: &Projectionist, item: &QueuedWorkItem, stats: &WorkerStats) {
        match projectionist.run_queued(item).await {
            Ok(Some(HandlerOutcome::Failed { .. })) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Some(_)) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => {
                warn!(
                    handler = %item.handler(),
                    method = %item.method(),
                    event_id = %item.event().event_id(),
                    "handler no longer registered, dropping work item"
                );
                stats.orphaned.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(
                    handler = %item.handler(),
                    method = %item.method(),
                    event_id = %item.event().event_id(),
                    tags = ?item.tags(),
                    error = %err,
                    "queued event handler failed"
                );
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// worker 运行统计
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicUsize,
    failed: AtomicUsize,
    orphaned: AtomicUsize,
    dropped: AtomicUsize,
}

impl WorkerStats {
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn orphaned(&self) -> usize {
        self.orphaned.load(Ordering::Relaxed)
    }

    /// 关闭时仍在缓冲中、未被执行的工作项数
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 已执行或已判定的工作项数（不含 `dropped`）
    pub fn total(&self) -> usize {
        self.processed() + self.failed() + self.orphaned()
    }
}

/// worker 运行句柄：用于优雅关闭与等待任务结束
pub struct WorkerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl WorkerHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// 等待后台任务结束
    ///
    /// 任务只在 `shutdown` 之后或工作项流结束时退出。worker 持有的 `Projectionist`
    /// 同时持有队列发送端，流不会自行结束，因此未调用 `shutdown` 时该方法不会返回。
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
