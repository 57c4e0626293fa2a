//! 分发报告（DispatchReport）
//!
//! `DispatchPass` 跟踪单次分发的状态机（Running → Aborted | Completed）并收集各处理器结果，
//! 完成后转换为只读的 `DispatchReport`。
//!
use crate::event::StoredEvent;
use crate::handler::HandlerId;
use crate::policy::{HandlerOutcome, PassState};

#[derive(Debug)]
pub(crate) struct DispatchPass {
    event_id: String,
    event_type: String,
    state: PassState,
    outcomes: Vec<(HandlerId, HandlerOutcome)>,
}

impl DispatchPass {
    pub(crate) fn start(event: &StoredEvent) -> Self {
        Self {
            event_id: event.event_id().to_string(),
            event_type: event.event_type().to_string(),
            state: PassState::Running,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> PassState {
        self.state
    }

    pub(crate) fn record(&mut self, handler: HandlerId, outcome: HandlerOutcome) {
        debug_assert_eq!(self.state, PassState::Running);
        self.outcomes.push((handler, outcome));
    }

    pub(crate) fn abort(&mut self) {
        if self.state == PassState::Running {
            self.state = PassState::Aborted;
        }
    }

    pub(crate) fn complete(mut self) -> DispatchReport {
        if self.state == PassState::Running {
            self.state = PassState::Completed;
        }
        DispatchReport {
            event_id: self.event_id,
            event_type: self.event_type,
            state: self.state,
            outcomes: self.outcomes,
        }
    }
}

/// 单次分发的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    event_id: String,
    event_type: String,
    state: PassState,
    outcomes: Vec<(HandlerId, HandlerOutcome)>,
}

impl DispatchReport {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// 按分发顺序排列的各处理器结果
    pub fn outcomes(&self) -> &[(HandlerId, HandlerOutcome)] {
        &self.outcomes
    }

    pub fn outcome_of(&self, handler: &HandlerId) -> Option<&HandlerOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == handler)
            .map(|(_, outcome)| outcome)
    }

    pub fn handled(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.select(|o| matches!(o, HandlerOutcome::Handled { .. }))
    }

    pub fn queued(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.select(|o| matches!(o, HandlerOutcome::Queued { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.select(|o| matches!(o, HandlerOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    fn select(
        &self,
        pred: impl Fn(&HandlerOutcome) -> bool + 'static,
    ) -> impl Iterator<Item = HandlerId> + '_ {
        self.outcomes
            .iter()
            .filter(move |(_, outcome)| pred(outcome))
            .map(|(id, _)| *id)
    }
}
