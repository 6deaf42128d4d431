//! Home-side TV bridge
//!
//! Subscribes to the TV's topic on the broker and turns each normalized
//! command into timed remote-control calls against a Sony Bravia set.

pub mod command;
pub mod config;
pub mod connection;
pub mod remote;
pub mod transport;
