//! Cloud-side smart home skill
//!
//! This crate handles:
//! - Parsing smart home directives
//! - Translating them into normalized TV commands and publishing those
//! - Building state reports, error responses and the discovery manifest

pub mod config;
pub mod directive;
pub mod discovery;
pub mod error;
pub mod publisher;
pub mod response;
pub mod translator;

pub use config::{ConfigError, SkillConfig};
pub use directive::{Directive, DirectiveEnvelope};
pub use error::{TranslateError, TranslateResult};
pub use publisher::{BrokerPublisher, Publisher};
pub use response::SkillResponse;
pub use translator::{translate, DirectiveTranslator, Translation};
