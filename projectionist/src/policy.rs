//! 异常策略（ExceptionPolicy）
//!
//! 每个处理器的一次尝试产出类型化结果（`Attempt`），策略据此给出裁决（`Verdict`）：
//! 继续分发并记录结果，或中止本次分发并返回错误。
//!
//! - `FailFast`（默认）：首个失败即中止，错误返回给事件发起方；
//! - `Catch`：失败被收容，调用处理器的 `on_handler_exception` 钩子后继续分发。
//!   钩子自身失败不再被捕获。
//!
use crate::error::ProjectionistError;
use crate::router::DispatchRecord;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExceptionPolicy {
    #[default]
    FailFast,
    Catch,
}

impl ExceptionPolicy {
    pub fn from_catch_exceptions(catch_exceptions: bool) -> Self {
        if catch_exceptions {
            Self::Catch
        } else {
            Self::FailFast
        }
    }

    pub fn catches(&self) -> bool {
        matches!(self, Self::Catch)
    }

    /// 对单个处理器的尝试结果给出裁决
    pub async fn judge(&self, record: &DispatchRecord<'_>, attempt: Attempt) -> Verdict {
        let method = record.method.clone();
        let error = match attempt {
            Attempt::Invoked => return Verdict::Continue(HandlerOutcome::Handled { method }),
            Attempt::Enqueued { tags } => {
                return Verdict::Continue(HandlerOutcome::Queued { method, tags });
            }
            Attempt::Failed(error) => error,
        };

        let handler = record.handler_id();
        match self {
            Self::FailFast => Verdict::Abort(ProjectionistError::HandlerInvocation {
                handler: handler.short_name().to_string(),
                event_type: record.event.event_type().to_string(),
                method,
                source: error,
            }),
            Self::Catch => {
                warn!(
                    handler = %handler,
                    method = %method,
                    event_type = %record.event.event_type(),
                    event_id = %record.event.event_id(),
                    error = %format!("{error:#}"),
                    "event handler failed, continuing dispatch"
                );

                if let Err(source) = record
                    .handler
                    .handler()
                    .on_handler_exception(record.event, &error)
                    .await
                {
                    return Verdict::Abort(ProjectionistError::ExceptionHook {
                        handler: handler.short_name().to_string(),
                        source,
                    });
                }

                Verdict::Continue(HandlerOutcome::Failed {
                    method,
                    reason: format!("{error:#}"),
                })
            }
        }
    }
}

/// 单个处理器的一次尝试
#[derive(Debug)]
pub enum Attempt {
    /// 同步调用成功
    Invoked,
    /// 已提交到队列
    Enqueued { tags: Vec<String> },
    /// 方法体或入队失败
    Failed(anyhow::Error),
}

/// 策略裁决
#[derive(Debug)]
pub enum Verdict {
    Continue(HandlerOutcome),
    Abort(ProjectionistError),
}

/// 单个处理器在一次分发中的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// 事件不在处理器关心的范围内
    Skipped,
    /// 同步执行成功
    Handled { method: String },
    /// 已交由异步 worker
    Queued { method: String, tags: Vec<String> },
    /// catch 模式下被收容的失败
    Failed { method: String, reason: String },
}

/// 单次分发的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Running,
    /// fail-fast 下首个失败后进入，终态
    Aborted,
    /// 全部处理器均已尝试
    Completed,
}
