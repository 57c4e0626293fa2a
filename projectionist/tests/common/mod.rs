#![allow(dead_code)]

use anyhow::{Result as AnyResult, bail};
use async_trait::async_trait;
use projectionist::error::ProjectionistResult;
use projectionist::event::{EventContext, StoredEvent};
use projectionist::handler::{EventHandler, HandledEvents, HandlerRole};
use projectionist::queue::{HandlerQueue, QueuedWorkItem};
use projectionist_macros::{event, event_handler};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[event]
pub enum AccountEvent {
    #[event(event_type = "MoneyAdded")]
    MoneyAdded { account_id: u64, amount: i64 },
    #[event(event_type = "MoneySubtracted")]
    MoneySubtracted { account_id: u64, amount: i64 },
    #[event(event_type = "AccountOpened")]
    AccountOpened { account_id: u64 },
}

impl AccountEvent {
    pub fn account_id(&self) -> u64 {
        match self {
            Self::MoneyAdded { account_id, .. }
            | Self::MoneySubtracted { account_id, .. }
            | Self::AccountOpened { account_id } => *account_id,
        }
    }
}

pub fn stored(event: AccountEvent) -> StoredEvent {
    StoredEvent::from_domain_event(&event, &EventContext::default()).unwrap()
}

pub fn money_added(account_id: u64, amount: i64) -> StoredEvent {
    stored(AccountEvent::MoneyAdded { account_id, amount })
}

// ---- 投影器 ----

#[derive(Clone, Default)]
pub struct BalanceProjector {
    pub balance: Arc<AtomicI64>,
    pub calls: Arc<AtomicUsize>,
}

#[event_handler]
impl BalanceProjector {
    #[handles("MoneyAdded")]
    async fn on_money_added(&self, event: &StoredEvent) -> AnyResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let AccountEvent::MoneyAdded { amount, .. } = event.payload_as::<AccountEvent>()? {
            self.balance.fetch_add(amount, Ordering::SeqCst);
        }
        Ok(())
    }

    #[handles("MoneySubtracted")]
    async fn on_money_subtracted(&self, event: &StoredEvent) -> AnyResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let AccountEvent::MoneySubtracted { amount, .. } = event.payload_as::<AccountEvent>()? {
            self.balance.fetch_sub(amount, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl EventHandler for BalanceProjector {
    fn role(&self) -> HandlerRole {
        HandlerRole::Projector
    }
}

/// 每次都失败的投影器，记录异常钩子的调用次数
#[derive(Clone, Default)]
pub struct FailingProjector {
    pub hook_calls: Arc<AtomicUsize>,
    pub hook_errors: Arc<Mutex<Vec<String>>>,
}

#[event_handler]
impl FailingProjector {
    #[handles("MoneyAdded")]
    fn on_money_added(&self, _event: &StoredEvent) -> AnyResult<()> {
        bail!("ledger unavailable")
    }
}

#[async_trait]
impl EventHandler for FailingProjector {
    fn role(&self) -> HandlerRole {
        HandlerRole::Projector
    }

    async fn on_handler_exception(
        &self,
        _event: &StoredEvent,
        error: &anyhow::Error,
    ) -> AnyResult<()> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        self.hook_errors.lock().unwrap().push(error.to_string());
        Ok(())
    }
}

/// 映射到不存在方法的投影器
#[derive(Default)]
pub struct MisconfiguredProjector;

#[event_handler]
impl MisconfiguredProjector {
    #[handles]
    fn on_anything(&self, _event: &StoredEvent) -> AnyResult<()> {
        Ok(())
    }
}

impl EventHandler for MisconfiguredProjector {
    fn role(&self) -> HandlerRole {
        HandlerRole::Projector
    }

    fn handled_events(&self) -> HandledEvents {
        HandledEvents::new().on("MoneyAdded", "on_money_added")
    }
}

// ---- 反应器 ----

/// 排队执行的通知反应器，按账户与事件类型打标签
#[derive(Clone, Default)]
pub struct NotificationReactor {
    pub sent: Arc<Mutex<Vec<String>>>,
}

#[event_handler]
impl NotificationReactor {
    #[handles("MoneyAdded")]
    async fn notify(&self, event: &StoredEvent) -> AnyResult<()> {
        self.sent.lock().unwrap().push(event.event_id().to_string());
        Ok(())
    }
}

impl EventHandler for NotificationReactor {
    fn role(&self) -> HandlerRole {
        HandlerRole::Reactor
    }

    fn is_queued(&self) -> bool {
        true
    }

    fn tags(&self, event: &StoredEvent) -> Vec<String> {
        let mut tags = Vec::new();
        if let Ok(account) = event.payload_as::<AccountEvent>() {
            tags.push(format!("Account:{}", account.account_id()));
        }
        tags.push(event.event_type().to_string());
        tags
    }
}

/// 同步审计反应器
#[derive(Clone, Default)]
pub struct AuditReactor {
    pub entries: Arc<Mutex<Vec<String>>>,
}

#[event_handler]
impl AuditReactor {
    #[handles("MoneyAdded", "MoneySubtracted")]
    fn record(&self, event: &StoredEvent) -> AnyResult<()> {
        self.entries
            .lock()
            .unwrap()
            .push(event.event_type().to_string());
        Ok(())
    }
}

impl EventHandler for AuditReactor {
    fn role(&self) -> HandlerRole {
        HandlerRole::Reactor
    }
}

// ---- 队列 ----

/// 只记录工作项的队列
#[derive(Clone, Default)]
pub struct RecordingQueue {
    pub items: Arc<Mutex<Vec<QueuedWorkItem>>>,
}

#[async_trait]
impl HandlerQueue for RecordingQueue {
    async fn enqueue(&self, item: QueuedWorkItem) -> ProjectionistResult<()> {
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}
