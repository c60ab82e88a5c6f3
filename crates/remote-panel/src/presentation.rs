//! What a host UI needs from the panel: which controls are live, and the
//! intents it may send back.

use remote_proto::protocol::{Channel, Status, MAX_VOLUME};

/// Volume change per key press / slider notch.
pub const VOLUME_STEP: u8 = 5;

/// A discrete user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Play(Channel),
    Stop,
    SetVolume(u8),
    SetAutoconnect(bool),
}

/// Enabled/disabled state of each control, derived from a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub play_enabled: bool,
    pub stop_enabled: bool,
    pub volume_enabled: bool,
    pub autoconnect_enabled: bool,
    pub volume: u8,
    pub autoconnect: bool,
}

impl ControlState {
    pub fn from_status(status: &Status) -> Self {
        Self {
            play_enabled: status.available,
            stop_enabled: status.playing,
            volume_enabled: status.available,
            autoconnect_enabled: status.available,
            volume: status.volume,
            autoconnect: status.autoconnect,
        }
    }

    /// Whether the control producing `intent` is enabled.
    pub fn allows(&self, intent: &Intent) -> bool {
        match intent {
            Intent::Play(_) => self.play_enabled,
            Intent::Stop => self.stop_enabled,
            Intent::SetVolume(_) => self.volume_enabled,
            Intent::SetAutoconnect(_) => self.autoconnect_enabled,
        }
    }

    pub fn volume_up(&self) -> Intent {
        Intent::SetVolume(self.volume.saturating_add(VOLUME_STEP).min(MAX_VOLUME))
    }

    pub fn volume_down(&self) -> Intent {
        Intent::SetVolume(self.volume.saturating_sub(VOLUME_STEP))
    }

    pub fn toggle_autoconnect(&self) -> Intent {
        Intent::SetAutoconnect(!self.autoconnect)
    }
}
