//! Discrete remote-control actions

use std::fmt;

/// One physical button press on the TV remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteAction {
    PowerOn,
    PowerOff,
    Mute,
    VolumeUp,
    VolumeDown,
    /// Numeric keypad digit, always 0-9
    Num(u8),
    Play,
    Pause,
    Stop,
}

impl RemoteAction {
    /// Playback action named exactly as the remote names it
    pub fn playback(name: &str) -> Option<Self> {
        match name {
            "Play" => Some(RemoteAction::Play),
            "Pause" => Some(RemoteAction::Pause),
            "Stop" => Some(RemoteAction::Stop),
            _ => None,
        }
    }

    /// Vendor command name, e.g. `VolumeUp` or `Num4`
    pub fn name(&self) -> String {
        match self {
            RemoteAction::PowerOn => "PowerOn".into(),
            RemoteAction::PowerOff => "PowerOff".into(),
            RemoteAction::Mute => "Mute".into(),
            RemoteAction::VolumeUp => "VolumeUp".into(),
            RemoteAction::VolumeDown => "VolumeDown".into(),
            RemoteAction::Num(d) => format!("Num{}", d),
            RemoteAction::Play => "Play".into(),
            RemoteAction::Pause => "Pause".into(),
            RemoteAction::Stop => "Stop".into(),
        }
    }
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
