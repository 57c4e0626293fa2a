use projectionist::event::DomainEvent;
use projectionist_macros::event;
use serde::{Deserialize, Serialize};

// 单元变体
#[event]
enum UnitVariantEvent {
    Activated,
    Deactivated,
}

// 元组变体
#[event(version = 3)]
enum TupleEvent {
    Updated(String),
    Changed(i32, String, bool),
}

// 混合变体，已有派生不会重复
#[event]
#[derive(Debug, Clone, Serialize, Deserialize)]
enum MixedEvent {
    Started,
    Updated(String),
    #[event(event_type = "custom.completed", event_version = 2)]
    Completed { result: i32 },
}

fn main() {
    assert_eq!(
        UnitVariantEvent::Activated.event_type(),
        "UnitVariantEvent.Activated"
    );
    assert_eq!(UnitVariantEvent::Deactivated.event_version(), 1);

    let updated = TupleEvent::Updated("value".to_string());
    assert_eq!(updated.event_type(), "TupleEvent.Updated");
    assert_eq!(updated.event_version(), 3);
    let changed = TupleEvent::Changed(42, "changed".to_string(), true);
    assert_eq!(changed.event_type(), "TupleEvent.Changed");

    assert_eq!(MixedEvent::Started.event_type(), "MixedEvent.Started");
    assert_eq!(
        MixedEvent::Updated("u".to_string()).event_type(),
        "MixedEvent.Updated"
    );
    let completed = MixedEvent::Completed { result: 100 };
    assert_eq!(completed.event_type(), "custom.completed");
    assert_eq!(completed.event_version(), 2);

    let json = serde_json::to_value(&completed).unwrap();
    let back: MixedEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, completed);
}
