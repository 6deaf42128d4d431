//! Timer-driven plan execution
//!
//! Every step gets its own task that sleeps until `start + delay` and then
//! performs its call. Steps are not chained on completion, so a slow TV
//! response never delays later steps.

use super::plan::{RemoteCall, SequencePlan};
use crate::remote::RemoteControl;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error};

/// Outstanding steps of one scheduled plan
#[derive(Debug)]
pub struct PlanHandle {
    steps: Vec<JoinHandle<()>>,
}

impl PlanHandle {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Cancel every step that has not fired yet
    pub fn abort(&self) {
        for step in &self.steps {
            step.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.is_finished())
    }

    /// Wait for all steps to fire (or be aborted)
    pub async fn join(self) {
        join_all(self.steps).await;
    }
}

/// Schedules plans against one shared remote-control session
#[derive(Clone)]
pub struct PlanScheduler {
    remote: Arc<dyn RemoteControl>,
}

impl PlanScheduler {
    pub fn new(remote: Arc<dyn RemoteControl>) -> Self {
        Self { remote }
    }

    /// Spawn the plan's steps and return without waiting for any of them
    pub fn schedule(&self, plan: SequencePlan) -> PlanHandle {
        let start = Instant::now();

        let steps = plan
            .steps()
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, step)| {
                let remote = self.remote.clone();
                tokio::spawn(async move {
                    sleep_until(start + step.delay).await;
                    debug!("[{}] step {} firing {}", remote.name(), index, step.call);

                    let result = match &step.call {
                        RemoteCall::Action(action) => remote.send_action(*action).await,
                        RemoteCall::SelectContent { uri } => remote.select_content(uri).await,
                    };

                    if let Err(e) = result {
                        error!("[{}] step {} ({}) failed: {:#}", remote.name(), index, step.call, e);
                    }
                })
            })
            .collect();

        PlanHandle { steps }
    }
}
