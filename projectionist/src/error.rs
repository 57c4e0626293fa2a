//! 分发核心统一错误定义
//!
//! 按来源区分三类错误：
//! - 注册期：处理器类型无法解析（`Resolution`），始终直接返回给注册调用方；
//! - 路由期：处理器声明的方法不存在（`InvalidEventHandler`），属于配置缺陷，不受异常策略影响；
//! - 调用期：处理器方法体失败或入队失败（`HandlerInvocation`），受 `ExceptionPolicy` 约束。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProjectionistError {
    // --- 注册 ---
    #[error("cannot resolve event handler: {name}")]
    Resolution { name: String },

    // --- 路由 ---
    #[error(
        "invalid event handler: handler={handler}, event_type={event_type}, method={method} is not a handler method"
    )]
    InvalidEventHandler {
        handler: String,
        event_type: String,
        method: String,
    },

    // --- 调用 ---
    #[error(
        "event handler failed: handler={handler}, event_type={event_type}, method={method}, reason={source}"
    )]
    HandlerInvocation {
        handler: String,
        event_type: String,
        method: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("exception hook failed: handler={handler}, reason={source}")]
    ExceptionHook {
        handler: String,
        #[source]
        source: anyhow::Error,
    },

    // --- 队列 ---
    #[error("handler queue error: {reason}")]
    Queue { reason: String },

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl ProjectionistError {
    pub fn resolution(name: impl Into<String>) -> Self {
        Self::Resolution { name: name.into() }
    }

    pub fn queue(reason: impl Into<String>) -> Self {
        Self::Queue {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type ProjectionistResult<T> = Result<T, ProjectionistError>;
