//! Home-side command handling
//!
//! This module handles:
//! - Decoding normalized commands received from the topic
//! - Expanding them into timed plans of remote calls
//! - Scheduling each plan's steps against the TV

mod executor;
pub mod plan;
pub mod scheduler;
pub mod sequencer;

pub use executor::{CommandExecutor, CommandResult};
pub use plan::{PlannedStep, RemoteCall, SequencePlan, STEP_DELAY, VOLUME_STEPS};
pub use scheduler::{PlanHandle, PlanScheduler};
pub use sequencer::{extract_digits, input_key, CommandSequencer, SequenceError};
