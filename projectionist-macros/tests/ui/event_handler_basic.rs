use projectionist::event::StoredEvent;
use projectionist::handler::{EventHandler, HandlerMethods, HandlerRole};
use projectionist_macros::event_handler;
use std::sync::Mutex;

#[derive(Default)]
struct Counter {
    seen: Mutex<Vec<String>>,
}

#[event_handler]
impl Counter {
    #[handles("MoneyAdded", "MoneySubtracted")]
    async fn on_money(&self, event: &StoredEvent) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(event.event_type().to_string());
        Ok(())
    }

    #[handles("AccountClosed")]
    fn on_closed(&self, _event: &StoredEvent) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("closed"))
    }

    #[handles]
    fn on_anything(&self, _event: &StoredEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn helper(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl EventHandler for Counter {
    fn role(&self) -> HandlerRole {
        HandlerRole::Projector
    }

    fn fallback_method(&self) -> Option<&str> {
        Some("on_anything")
    }
}

fn main() {
    let counter = Counter::default();
    assert_eq!(
        counter.method_names(),
        &["on_money", "on_closed", "on_anything"]
    );
    assert!(counter.has_method("on_anything"));
    assert!(!counter.has_method("helper"));

    let events = counter.handled_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events.method_for("MoneyAdded"), Some("on_money"));
    assert_eq!(events.method_for("MoneySubtracted"), Some("on_money"));
    assert_eq!(events.method_for("AccountClosed"), Some("on_closed"));
    assert_eq!(events.method_for("Unknown"), None);

    let added = StoredEvent::builder().event_type("MoneyAdded").build();
    let closed = StoredEvent::builder().event_type("AccountClosed").build();
    block_on(async {
        counter.call_method("on_money", &added).await.unwrap();
        assert!(counter.call_method("on_closed", &closed).await.is_err());
        assert!(counter.call_method("helper", &added).await.is_err());
    });
    assert_eq!(counter.helper(), 1);
}

fn block_on<F: std::future::Future<Output = ()>>(future: F) {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future);
}
