//! 事件处理器分发核心（projectionist）
//!
//! 事件溯源框架中负责“事件发生后通知谁”的部分：
//! - 处理器（`handler`）：投影器维护读模型，反应器触发副作用；
//!   以静态方法表声明关心的事件类型与对应方法；
//! - 注册表（`registry`）：投影器、反应器两个有序且按类型去重的集合，支持动态增删；
//! - 路由（`router`）：为（处理器，事件）解析出零个或一个方法；
//! - 执行器（`executor`）：按注册顺序同步调用，或将工作项提交给队列（`queue`）；
//! - 异常策略（`policy`）：决定处理器失败时中止还是收容并继续。
//!
//! 事件存储、重放与队列中间件不在本 crate 范围内，仅定义与之协作的接口；
//! `queue` 特性提供内存队列与后台 worker，便于测试与本地开发。
//!
//! 典型用法：
//! 1. 为事件枚举标注 `#[event]`，为处理器 impl 块标注 `#[event_handler]`；
//! 2. 实现 `EventHandler` 声明角色、排队与标签等能力；
//! 3. 构建 `Projectionist` 并注册处理器；
//! 4. 事件持久化后调用 `Projectionist::handle`。
//!
pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod handler;
pub mod policy;
pub mod queue;
pub mod registry;
pub mod report;
pub mod router;

pub use executor::Projectionist;

// 允许在本 crate 内部通过 ::projectionist 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::projectionist 路径。
extern crate self as projectionist;

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use async_trait::async_trait;
}
