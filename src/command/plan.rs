//! Sequencing plans: timed lists of remote calls

use crate::remote::RemoteAction;
use std::fmt;
use std::time::Duration;

/// Spacing between consecutive steps of a multi-step plan
pub const STEP_DELAY: Duration = Duration::from_millis(1000);

/// Presses issued for any volume adjustment, whatever the requested delta
pub const VOLUME_STEPS: usize = 5;

/// A single call against the remote-control session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Action(RemoteAction),
    SelectContent { uri: String },
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCall::Action(action) => write!(f, "{}", action),
            RemoteCall::SelectContent { uri } => write!(f, "SelectContent({})", uri),
        }
    }
}

/// A call and its delay from the start of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub delay: Duration,
    pub call: RemoteCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequencePlan {
    steps: Vec<PlannedStep>,
}

impl SequencePlan {
    pub fn single(call: RemoteCall) -> Self {
        Self {
            steps: vec![PlannedStep {
                delay: Duration::ZERO,
                call,
            }],
        }
    }

    /// Actions spaced `STEP_DELAY` apart, the first at zero
    pub fn spaced<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = RemoteAction>,
    {
        let steps = actions
            .into_iter()
            .enumerate()
            .map(|(i, action)| PlannedStep {
                delay: STEP_DELAY * i as u32,
                call: RemoteCall::Action(action),
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Calls in firing order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.steps.iter().map(|s| s.call.clone()).collect()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.steps.iter().map(|s| s.delay).collect()
    }
}
