//! Trigger evaluation

use crate::core::{
    event::{Event, EventKind},
    workflow::WorkflowDefinition,
};

/// Decide whether `event` should start a run of `definition`
///
/// Push and pull_request events must name a branch in the declared filter.
/// Manual events match whenever manual dispatch is allowed.
pub fn should_run(event: &Event, definition: &WorkflowDefinition) -> bool {
    let triggers = &definition.triggers;
    let branch = event.target_branch.as_deref();

    match event.kind {
        EventKind::Push => triggers.push.as_ref().is_some_and(|t| t.matches(branch)),
        EventKind::PullRequest => triggers
            .pull_request
            .as_ref()
            .is_some_and(|t| t.matches(branch)),
        EventKind::Manual => triggers.manual,
    }
}
