use projectionist_macros::event_handler;

struct Ledger;

#[event_handler]
impl Ledger {
    #[handles("MoneyAdded")]
    fn first(&self, _event: &projectionist::event::StoredEvent) -> anyhow::Result<()> {
        Ok(())
    }

    #[handles("MoneySubtracted", "MoneyAdded")]
    fn second(&self, _event: &projectionist::event::StoredEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

fn main() {
    let _ = Ledger;
}
