use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path prefix of the RPC endpoint.  A call to `play` is a
/// `POST {endpoint}/rpc/play` with the argument object as JSON body.
pub const RPC_PATH_PREFIX: &str = "/rpc";

/// Methods exposed by the playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetStatus,
    GetNowPlaying,
    Play,
    Stop,
    SetVolume,
    SetAutoconnect,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::GetStatus,
        Method::GetNowPlaying,
        Method::Play,
        Method::Stop,
        Method::SetVolume,
        Method::SetAutoconnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GetStatus => "get_status",
            Method::GetNowPlaying => "get_now_playing",
            Method::Play => "play",
            Method::Stop => "stop",
            Method::SetVolume => "set_volume",
            Method::SetAutoconnect => "set_autoconnect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two live channels.  Serialised as the bare integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    pub fn number(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    /// Lenient mapping used by the backend: `1` is channel 1, anything else
    /// is channel 2.
    pub fn coerce(value: i64) -> Self {
        if value == 1 {
            Channel::One
        } else {
            Channel::Two
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            other => Err(format!("invalid channel {other}, expected 1 or 2")),
        }
    }
}

impl From<Channel> for u8 {
    fn from(ch: Channel) -> Self {
        ch.number()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

pub const MAX_VOLUME: u8 = 100;

/// Authoritative snapshot of the playback backend.
///
/// `playing` and `channel` move together: a playing backend always reports
/// its channel and a stopped one never does.  Deserialisation rejects
/// payloads that break this, or that carry a volume above [`MAX_VOLUME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StatusWire")]
pub struct Status {
    pub available: bool,
    pub playing: bool,
    pub channel: Option<Channel>,
    pub player: Option<String>,
    pub volume: u8,
    pub autoconnect: bool,
}

/// Panel start-up state: controls stay gated until the first poll lands.
impl Default for Status {
    fn default() -> Self {
        Self {
            available: false,
            playing: false,
            channel: None,
            player: None,
            volume: 70,
            autoconnect: true,
        }
    }
}

impl Status {
    pub fn is_consistent(&self) -> bool {
        self.playing == self.channel.is_some() && self.volume <= MAX_VOLUME
    }

    /// Local view after a stop: nothing plays, nothing is tuned.
    pub fn mark_stopped(&mut self) {
        self.playing = false;
        self.channel = None;
    }
}

#[derive(Deserialize)]
struct StatusWire {
    available: bool,
    playing: bool,
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    player: Option<String>,
    volume: u8,
    autoconnect: bool,
}

impl TryFrom<StatusWire> for Status {
    type Error = String;

    fn try_from(w: StatusWire) -> Result<Self, Self::Error> {
        if w.playing != w.channel.is_some() {
            return Err(format!(
                "inconsistent status: playing={} channel={:?}",
                w.playing, w.channel
            ));
        }
        if w.volume > MAX_VOLUME {
            return Err(format!("volume {} out of range 0..=100", w.volume));
        }
        Ok(Status {
            available: w.available,
            playing: w.playing,
            channel: w.channel,
            player: w.player,
            volume: w.volume,
            autoconnect: w.autoconnect,
        })
    }
}

/// Current and upcoming show on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShowInfo {
    #[serde(default)]
    pub now_title: Option<String>,
    #[serde(default)]
    pub now_image: Option<String>,
    #[serde(default)]
    pub next_title: Option<String>,
    #[serde(default)]
    pub next_image: Option<String>,
}

/// Descriptive metadata for both channels.  Empty until the backend has
/// fetched it at least once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    #[serde(default)]
    pub ch1: Option<ShowInfo>,
    #[serde(default)]
    pub ch2: Option<ShowInfo>,
    /// Unix seconds on the wire.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl NowPlaying {
    pub fn for_channel(&self, ch: Channel) -> Option<&ShowInfo> {
        match ch {
            Channel::One => self.ch1.as_ref(),
            Channel::Two => self.ch2.as_ref(),
        }
    }
}

// ── argument bags ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayArgs {
    pub channel: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeArgs {
    pub volume: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoconnectArgs {
    pub enabled: bool,
}

// ── envelopes ────────────────────────────────────────────────────────────────

/// Body of a successful RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub result: serde_json::Value,
}

/// Body of a failed RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFault {
    pub error: String,
}
