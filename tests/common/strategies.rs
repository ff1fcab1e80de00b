use evaluator_core::state_machine::ReportedState;
use proptest::prelude::*;

/// One thing that can happen to a running evaluator
#[derive(Debug, Clone)]
pub enum LifecycleInput {
    /// A heartbeat, optionally carrying an evaluator status
    Heartbeat(Option<ReportedState>),
    /// A container status from the resource manager
    ResourceStatus(ReportedState),
    /// A failure raised by the transport layer
    Exception,
    /// User or driver shutdown
    Close,
}

pub fn reported_state_strategy() -> impl Strategy<Value = ReportedState> {
    prop_oneof![
        Just(ReportedState::Init),
        Just(ReportedState::Running),
        Just(ReportedState::Suspend),
        Just(ReportedState::Done),
        Just(ReportedState::Failed),
        Just(ReportedState::Killed),
    ]
}

/// Evaluator statuses a heartbeat may carry; only DONE and FAILED change anything
pub fn evaluator_status_strategy() -> impl Strategy<Value = Option<ReportedState>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some(ReportedState::Running)),
        1 => Just(Some(ReportedState::Done)),
        1 => Just(Some(ReportedState::Failed)),
    ]
}

pub fn lifecycle_input_strategy() -> impl Strategy<Value = LifecycleInput> {
    prop_oneof![
        4 => evaluator_status_strategy().prop_map(LifecycleInput::Heartbeat),
        2 => reported_state_strategy().prop_map(LifecycleInput::ResourceStatus),
        1 => Just(LifecycleInput::Exception),
        1 => Just(LifecycleInput::Close),
    ]
}

pub fn lifecycle_inputs_strategy() -> impl Strategy<Value = Vec<LifecycleInput>> {
    prop::collection::vec(lifecycle_input_strategy(), 1..24)
}

/// Heartbeat timestamps that may go backwards
pub fn timestamps_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..10_000, 1..32)
}
