use projectionist::event::DomainEvent;
use projectionist_macros::event;

#[event(version = 1)]
enum BankEvent {
    #[event(event_type = "bank.opened")]
    Opened { id: String, name: String },
    #[event(event_type = "bank.renamed", event_version = 2)]
    Renamed { id: String, to: String },
}

fn main() {
    let opened = BankEvent::Opened {
        id: "b-1".to_string(),
        name: "main".to_string(),
    };
    assert_eq!(opened.event_type(), "bank.opened");
    assert_eq!(opened.event_version(), 1);

    let renamed = BankEvent::Renamed {
        id: "b-1".to_string(),
        to: "savings".to_string(),
    };
    assert_eq!(renamed.event_type(), "bank.renamed");
    assert_eq!(renamed.event_version(), 2);
    assert_ne!(opened, renamed.clone());
}
