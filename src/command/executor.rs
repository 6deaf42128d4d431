//! Command executor - decodes, plans and schedules incoming commands

use super::scheduler::{PlanHandle, PlanScheduler};
use super::sequencer::{CommandSequencer, SequenceError};
use tracing::{info, warn};
use tvlink_shared::NormalizedCommand;

/// Outcome of handling one topic message
#[derive(Debug)]
pub enum CommandResult {
    /// Plan accepted; its steps fire on their own timers
    Scheduled { steps: usize, handle: PlanHandle },
    /// Command dropped, nothing sent to the TV
    Rejected { error: SequenceError },
}

impl CommandResult {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, CommandResult::Scheduled { .. })
    }
}

/// Handles commands arriving on the bridge's topic
pub struct CommandExecutor {
    sequencer: CommandSequencer,
    scheduler: PlanScheduler,
}

impl CommandExecutor {
    pub fn new(sequencer: CommandSequencer, scheduler: PlanScheduler) -> Self {
        Self {
            sequencer,
            scheduler,
        }
    }

    /// Handle a raw JSON payload from the topic
    pub fn execute(&self, payload: &str) -> CommandResult {
        match NormalizedCommand::from_payload(payload) {
            Ok(command) => self.execute_command(&command),
            Err(e) => {
                let error = SequenceError::from(e);
                warn!("Dropping undecodable command: {}", error);
                CommandResult::Rejected { error }
            }
        }
    }

    /// Handle a decoded command; returns as soon as its steps are scheduled
    pub fn execute_command(&self, command: &NormalizedCommand) -> CommandResult {
        info!(
            "Performing action {} on {} ({})",
            command.action, command.task, command.source
        );

        match self.sequencer.plan(command) {
            Ok(plan) => {
                let steps = plan.len();
                info!("  Scheduled {} step(s): {:?}", steps, plan.calls());
                CommandResult::Scheduled {
                    steps,
                    handle: self.scheduler.schedule(plan),
                }
            }
            Err(error) => {
                warn!("  Dropping command ({}): {}", error.category(), error);
                CommandResult::Rejected { error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::plan::RemoteCall;
    use crate::command::scheduler::tests::RecordingRemote;
    use crate::config::InputMap;
    use crate::remote::RemoteAction;
    use std::time::Duration;

    fn executor(remote: std::sync::Arc<RecordingRemote>) -> CommandExecutor {
        let mut inputs = InputMap::default();
        inputs.insert("DEVICE__BLURAY", "extInput:hdmi?port=2");
        CommandExecutor::new(
            CommandSequencer::new("TV 1", inputs),
            PlanScheduler::new(remote),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_payload_presses_power_on() {
        let remote = RecordingRemote::new();
        let result = executor(remote.clone())
            .execute(r#"{"source":"Alexa.PowerController","action":"ON","task":"power"}"#);

        match result {
            CommandResult::Scheduled { steps, handle } => {
                assert_eq!(steps, 1);
                handle.join().await;
            }
            other => panic!("expected scheduled, got {:?}", other),
        }
        assert_eq!(
            remote.recorded(),
            vec![(Duration::ZERO, RemoteCall::Action(RemoteAction::PowerOn))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_payload_schedules_five_downs() {
        let remote = RecordingRemote::new();
        let result = executor(remote.clone())
            .execute(r#"{"source":"Alexa.Speaker","action":-10,"task":"volume"}"#);

        let CommandResult::Scheduled { handle, .. } = result else {
            panic!("volume should schedule");
        };
        handle.join().await;

        let recorded = remote.recorded();
        assert_eq!(recorded.len(), 5);
        for (i, (at, call)) in recorded.iter().enumerate() {
            assert_eq!(*at, Duration::from_millis(1000 * i as u64));
            assert_eq!(*call, RemoteCall::Action(RemoteAction::VolumeDown));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_payload_selects_content() {
        let remote = RecordingRemote::new();
        let result = executor(remote.clone())
            .execute(r#"{"source":"Alexa.InputController","action":"bluray","task":"input"}"#);

        let CommandResult::Scheduled { handle, .. } = result else {
            panic!("input should schedule");
        };
        handle.join().await;

        assert_eq!(
            remote.recorded()[0].1,
            RemoteCall::SelectContent {
                uri: "extInput:hdmi?port=2".into()
            }
        );
    }

    #[tokio::test]
    async fn test_rejections_touch_nothing() {
        let remote = RecordingRemote::new();
        let exec = executor(remote.clone());

        let payloads = [
            "not json",
            r#"{"source":"Alexa.Speaker","action":1,"task":"power"}"#,
            r#"{"source":"Alexa.ChannelController","action":"ABC","task":"channel"}"#,
            r#"{"source":"Alexa.InputController","action":"HDMI 9","task":"input"}"#,
            r#"{"source":"Alexa.Discovery","action":"x","task":"control"}"#,
        ];

        for payload in payloads {
            assert!(!exec.execute(payload).is_scheduled(), "{} should be rejected", payload);
        }
        tokio::task::yield_now().await;
        assert!(remote.recorded().is_empty());
    }
}
