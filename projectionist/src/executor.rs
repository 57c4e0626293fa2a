//! 分发执行器（Projectionist）
//!
//! 显式持有的上下文对象：处理器注册表、异常策略配置与可选的处理器队列。
//! 启动时构建一次（或每个测试构建一次），通过引用或 `Arc` 传给事件源。
//!
//! 单次分发（`handle`）严格按注册顺序遍历：先投影器，后反应器。
//! 同步处理器执行完毕后才考虑下一个处理器；排队处理器提交工作项后立即继续。
//! 分发开始时对注册表取快照，分发过程中的注册表修改只影响之后的分发。
//!
use crate::config::ProjectionistConfig;
use crate::error::{ProjectionistError, ProjectionistResult as Result};
use crate::event::StoredEvent;
use crate::handler::{EventHandler, HandlerId, HandlerRole};
use crate::policy::{Attempt, ExceptionPolicy, HandlerOutcome, Verdict};
use crate::queue::{HandlerQueue, QueuedWorkItem};
use crate::registry::{HandlerCatalog, HandlerRegistry, RegisteredHandler};
use crate::report::{DispatchPass, DispatchReport};
use crate::router::{DispatchRecord, EventRouter};
use bon::Builder;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{Instrument, debug, error, info, info_span};

#[derive(Builder)]
pub struct Projectionist {
    #[builder(default)]
    config: ProjectionistConfig,
    /// 按类型名注册时使用的类型目录
    #[builder(default)]
    catalog: HandlerCatalog,
    /// 排队处理器的工作项提交目标
    queue: Option<Arc<dyn HandlerQueue>>,
    #[builder(skip)]
    registry: RwLock<HandlerRegistry>,
}

impl fmt::Debug for Projectionist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.read();
        f.debug_struct("Projectionist")
            .field("config", &self.config)
            .field("projectors", &registry.projectors())
            .field("reactors", &registry.reactors())
            .field("queue", &self.queue.is_some())
            .finish()
    }
}

impl Default for Projectionist {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Projectionist {
    pub fn new(config: ProjectionistConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ProjectionistConfig {
        &self.config
    }

    pub fn exception_policy(&self) -> ExceptionPolicy {
        self.config.exception_policy()
    }

    /// 按配置中的类型名注册投影器与反应器
    pub fn bootstrap(&self) -> Result<&Self> {
        for name in &self.config.projectors {
            self.add_projector_named(name)?;
        }
        for name in &self.config.reactors {
            self.add_reactor_named(name)?;
        }
        info!(
            projectors = self.config.projectors.len(),
            reactors = self.config.reactors.len(),
            "bootstrapped event handlers from config"
        );
        Ok(self)
    }

    // ---- 注册 ----

    pub fn add_projector<H>(&self, handler: H) -> &Self
    where
        H: EventHandler,
    {
        self.register(HandlerRole::Projector, RegisteredHandler::new(handler))
    }

    pub fn add_reactor<H>(&self, handler: H) -> &Self
    where
        H: EventHandler,
    {
        self.register(HandlerRole::Reactor, RegisteredHandler::new(handler))
    }

    /// 以默认实例注册投影器
    pub fn add_projector_type<H>(&self) -> &Self
    where
        H: EventHandler + Default,
    {
        self.add_projector(H::default())
    }

    /// 以默认实例注册反应器
    pub fn add_reactor_type<H>(&self) -> &Self
    where
        H: EventHandler + Default,
    {
        self.add_reactor(H::default())
    }

    /// 通过类型目录按名称注册投影器；未知名称返回 `Resolution` 错误
    pub fn add_projector_named(&self, name: &str) -> Result<&Self> {
        let entry = self.catalog.resolve(name)?;
        Ok(self.register(HandlerRole::Projector, entry))
    }

    /// 通过类型目录按名称注册反应器；未知名称返回 `Resolution` 错误
    pub fn add_reactor_named(&self, name: &str) -> Result<&Self> {
        let entry = self.catalog.resolve(name)?;
        Ok(self.register(HandlerRole::Reactor, entry))
    }

    /// 按处理器自身声明的角色注册
    pub fn add_event_handler<H>(&self, handler: H) -> &Self
    where
        H: EventHandler,
    {
        let entry = RegisteredHandler::new(handler);
        self.register(entry.role(), entry)
    }

    fn register(&self, role: HandlerRole, entry: RegisteredHandler) -> &Self {
        let id = entry.id();
        let inserted = {
            let mut registry = self.write();
            match role {
                HandlerRole::Projector => registry.add_projector(entry),
                HandlerRole::Reactor => registry.add_reactor(entry),
            }
        };

        if inserted {
            info!(handler = %id, role = %role, "registered event handler");
        } else {
            debug!(handler = %id, role = %role, "event handler already registered");
        }
        self
    }

    // ---- 查询 ----

    pub fn projectors(&self) -> Vec<RegisteredHandler> {
        self.read().projectors().to_vec()
    }

    pub fn reactors(&self) -> Vec<RegisteredHandler> {
        self.read().reactors().to_vec()
    }

    pub fn find_handler(&self, id: &HandlerId) -> Option<RegisteredHandler> {
        self.read().find(id).cloned()
    }

    // ---- 移除 ----

    pub fn without_event_handler(&self, id: &HandlerId) -> &Self {
        self.write().without_event_handler(id);
        self
    }

    pub fn without_event_handlers(&self, ids: Option<&[HandlerId]>) -> &Self {
        self.write().without_event_handlers(ids);
        self
    }

    pub fn without_projectors(&self, ids: Option<&[HandlerId]>) -> &Self {
        self.write().without_projectors(ids);
        self
    }

    pub fn without_reactors(&self, ids: Option<&[HandlerId]>) -> &Self {
        self.write().without_reactors(ids);
        self
    }

    // ---- 分发 ----

    /// 将事件分发给所有已注册的处理器
    pub async fn handle(&self, event: &StoredEvent) -> Result<DispatchReport> {
        let span = info_span!(
            "dispatch",
            event_type = %event.event_type(),
            event_id = %event.event_id()
        );
        self.dispatch(event).instrument(span).await
    }

    /// 依次分发多个事件，遇到首个错误即停止
    pub async fn handle_many(&self, events: &[StoredEvent]) -> Result<Vec<DispatchReport>> {
        let mut reports = Vec::with_capacity(events.len());
        for event in events {
            reports.push(self.handle(event).await?);
        }
        Ok(reports)
    }

    /// worker 侧执行排队的工作项
    ///
    /// 按身份重新解析处理器；处理器已被移除时返回 `Ok(None)`。
    /// 方法失败时与同步分发使用同一异常策略。
    pub async fn run_queued(&self, item: &QueuedWorkItem) -> Result<Option<HandlerOutcome>> {
        let Some(entry) = self.find_handler(&item.handler()) else {
            return Ok(None);
        };

        let span = info_span!(
            "queued",
            handler = %item.handler(),
            method = %item.method(),
            event_id = %item.event().event_id()
        );

        async {
            let record = DispatchRecord {
                event: item.event(),
                handler: &entry,
                method: item.method().to_string(),
            };

            if !entry.handler().has_method(&record.method) {
                return Err(ProjectionistError::InvalidEventHandler {
                    handler: entry.id().short_name().to_string(),
                    event_type: record.event.event_type().to_string(),
                    method: record.method,
                });
            }

            let attempt = Self::invoke(&record).await;
            match self.exception_policy().judge(&record, attempt).await {
                Verdict::Continue(outcome) => Ok(Some(outcome)),
                Verdict::Abort(err) => Err(err),
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, event: &StoredEvent) -> Result<DispatchReport> {
        let handlers: Vec<RegisteredHandler> = self.read().dispatch_order().cloned().collect();
        let policy = self.exception_policy();
        let mut pass = DispatchPass::start(event);

        for entry in &handlers {
            let record = match EventRouter::route(entry, event) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(handler = %entry.id(), "event not handled, skipping");
                    pass.record(entry.id(), HandlerOutcome::Skipped);
                    continue;
                }
                Err(err) => {
                    pass.abort();
                    error!(handler = %entry.id(), error = %err, "invalid event handler");
                    return Err(err);
                }
            };

            let attempt = self.attempt(&record).await;
            match policy.judge(&record, attempt).await {
                Verdict::Continue(outcome) => pass.record(record.handler_id(), outcome),
                Verdict::Abort(err) => {
                    pass.abort();
                    error!(
                        handler = %record.handler_id(),
                        method = %record.method,
                        state = ?pass.state(),
                        error = %err,
                        "dispatch aborted"
                    );
                    return Err(err);
                }
            }
        }

        let report = pass.complete();
        debug!(
            handlers = report.outcomes().len(),
            failures = report.failures().count(),
            "dispatch completed"
        );
        Ok(report)
    }

    async fn attempt(&self, record: &DispatchRecord<'_>) -> Attempt {
        let handler = record.handler.handler();
        if !handler.is_queued() {
            return Self::invoke(record).await;
        }

        let tags = handler.tags(record.event);
        let item = QueuedWorkItem::new(
            record.event.clone(),
            record.handler_id(),
            record.method.clone(),
            tags.clone(),
            self.config.queue.clone(),
        );

        let submitted = match &self.queue {
            Some(queue) => queue.enqueue(item).await,
            None => Err(ProjectionistError::queue("no handler queue configured")),
        };

        match submitted {
            Ok(()) => Attempt::Enqueued { tags },
            Err(err) => Attempt::Failed(err.into()),
        }
    }

    async fn invoke(record: &DispatchRecord<'_>) -> Attempt {
        debug!(
            handler = %record.handler_id(),
            method = %record.method,
            "invoking event handler"
        );
        match record
            .handler
            .handler()
            .call_method(&record.method, record.event)
            .await
        {
            Ok(()) => Attempt::Invoked,
            Err(err) => Attempt::Failed(err),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HandlerRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandlerRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
