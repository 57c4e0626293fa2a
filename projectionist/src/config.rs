//! 分发核心配置
//!
use crate::policy::ExceptionPolicy;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionistConfig {
    /// 为 true 时收容处理器失败并继续分发；默认 false（首个失败即中止）
    pub catch_exceptions: bool,
    /// 排队处理器的工作项所投递的队列名
    pub queue: Option<String>,
    /// 启动时按类型名注册的投影器
    pub projectors: Vec<String>,
    /// 启动时按类型名注册的反应器
    pub reactors: Vec<String>,
}

impl ProjectionistConfig {
    pub fn exception_policy(&self) -> ExceptionPolicy {
        ExceptionPolicy::from_catch_exceptions(self.catch_exceptions)
    }
}
