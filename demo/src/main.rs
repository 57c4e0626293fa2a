use anyhow::Result as AnyResult;
use async_trait::async_trait;
use projectionist::Projectionist;
use projectionist::config::ProjectionistConfig;
use projectionist::event::{EventContext, StoredEvent};
use projectionist::handler::{EventHandler, HandlerRole};
use projectionist::queue::{InMemoryHandlerQueue, QueueWorker};
use projectionist::registry::HandlerCatalog;
use projectionist_macros::{event, event_handler};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[event]
enum AccountEvent {
    #[event(event_type = "AccountOpened")]
    AccountOpened { account_id: u64, owner: String },
    #[event(event_type = "MoneyAdded")]
    MoneyAdded { account_id: u64, amount: i64 },
    #[event(event_type = "MoneySubtracted")]
    MoneySubtracted { account_id: u64, amount: i64 },
}

impl AccountEvent {
    fn account_id(&self) -> u64 {
        match self {
            Self::AccountOpened { account_id, .. }
            | Self::MoneyAdded { account_id, .. }
            | Self::MoneySubtracted { account_id, .. } => *account_id,
        }
    }
}

/// 账户余额读模型
#[derive(Clone, Default)]
struct BalanceProjector {
    balances: Arc<Mutex<HashMap<u64, i64>>>,
}

#[event_handler]
impl BalanceProjector {
    #[handles("AccountOpened")]
    fn on_opened(&self, event: &StoredEvent) -> AnyResult<()> {
        let account = event.payload_as::<AccountEvent>()?;
        self.balances
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(account.account_id(), 0);
        Ok(())
    }

    #[handles("MoneyAdded", "MoneySubtracted")]
    fn on_money(&self, event: &StoredEvent) -> AnyResult<()> {
        let account = event.payload_as::<AccountEvent>()?;
        let delta = match account {
            AccountEvent::MoneyAdded { amount, .. } => amount,
            AccountEvent::MoneySubtracted { amount, .. } => -amount,
            AccountEvent::AccountOpened { .. } => 0,
        };
        let account_id = account.account_id();
        *self
            .balances
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(account_id)
            .or_default() += delta;
        Ok(())
    }

    fn balance(&self, account_id: u64) -> i64 {
        self.balances
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&account_id)
            .copied()
            .unwrap_or_default()
    }
}

impl EventHandler for BalanceProjector {
    fn role(&self) -> HandlerRole {
        HandlerRole::Projector
    }
}

/// 大额入账审查，超过阈值时失败
#[derive(Default)]
struct LimitReactor;

#[event_handler]
impl LimitReactor {
    #[handles("MoneyAdded")]
    fn check(&self, event: &StoredEvent) -> AnyResult<()> {
        if let AccountEvent::MoneyAdded { amount, .. } = event.payload_as::<AccountEvent>()? {
            anyhow::ensure!(amount <= 10_000, "deposit of {amount} exceeds limit");
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for LimitReactor {
    fn role(&self) -> HandlerRole {
        HandlerRole::Reactor
    }

    async fn on_handler_exception(
        &self,
        event: &StoredEvent,
        error: &anyhow::Error,
    ) -> AnyResult<()> {
        warn!(event_id = %event.event_id(), error = %error, "flagging deposit for review");
        Ok(())
    }
}

/// 入账通知，由后台 worker 执行
#[derive(Default)]
struct NotificationReactor;

#[event_handler]
impl NotificationReactor {
    #[handles("MoneyAdded")]
    async fn notify(&self, event: &StoredEvent) -> AnyResult<()> {
        if let AccountEvent::MoneyAdded { account_id, amount } =
            event.payload_as::<AccountEvent>()?
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
            info!(account_id, amount, "notification sent");
        }
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

/// 从 `PROJECTIONIST_CONFIG`（JSON）读取配置，缺省时开启 catch 模式
fn load_config() -> AnyResult<ProjectionistConfig> {
    match std::env::var("PROJECTIONIST_CONFIG") {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(_) => Ok(ProjectionistConfig {
            catch_exceptions: true,
            queue: Some("notifications".to_string()),
            reactors: vec!["LimitReactor".to_string()],
            ..Default::default()
        }),
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("projectionist=info".parse()?),
        )
        .init();

    let queue = InMemoryHandlerQueue::new(64);
    let items = queue.subscribe()?;

    let catalog = HandlerCatalog::new()
        .register::<LimitReactor>()
        .register::<NotificationReactor>();
    let projectionist = Arc::new(
        Projectionist::builder()
            .config(load_config()?)
            .catalog(catalog)
            .queue(Arc::new(queue))
            .build(),
    );

    let balances = BalanceProjector::default();
    projectionist
        .bootstrap()?
        .add_projector(balances.clone())
        .add_reactor_type::<NotificationReactor>();

    let worker = QueueWorker::new(projectionist.clone(), items).start();

    let context = EventContext::builder()
        .correlation_id("demo-session")
        .actor_type("user")
        .actor_id("alice")
        .build();
    let events = [
        AccountEvent::AccountOpened {
            account_id: 42,
            owner: "alice".to_string(),
        },
        AccountEvent::MoneyAdded {
            account_id: 42,
            amount: 1_000,
        },
        AccountEvent::MoneyAdded {
            account_id: 42,
            amount: 50_000,
        },
        AccountEvent::MoneySubtracted {
            account_id: 42,
            amount: 300,
        },
    ]
    .iter()
    .map(|event| StoredEvent::from_domain_event(event, &context))
    .collect::<Result<Vec<_>, _>>()?;

    for report in projectionist.handle_many(&events).await? {
        info!(
            event_type = %report.event_type(),
            handled = report.handled().count(),
            queued = report.queued().count(),
            failures = report.failures().count(),
            "event dispatched"
        );
    }

    let stats = worker.stats();
    while stats.total() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown();
    worker.join().await;

    info!(
        balance = balances.balance(42),
        processed = stats.processed(),
        failed = stats.failed(),
        "demo finished"
    );
    Ok(())
}
