//! Playback backend: owns the player, the tuning state and the last fetched
//! metadata, and answers RPC methods by name.

use std::sync::Arc;
use std::time::Duration;

use remote_proto::config::{Config, StreamsConfig};
use remote_proto::platform;
use remote_proto::protocol::{
    AutoconnectArgs, Channel, Method, NowPlaying, PlayArgs, Status, VolumeArgs, MAX_VOLUME,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::player::{Player, PlayerKind};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("invalid arguments for {method}: {message}")]
    InvalidArguments { method: Method, message: String },

    #[error("No player found. Install mpv (or the mpv/VLC Flatpak), then restart nts-remoted.")]
    NoPlayer,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

struct Tuned {
    channel: Channel,
    url: String,
}

struct Playback {
    player: Option<Player>,
    current: Option<Tuned>,
    volume: u8,
    autoconnect: bool,
}

impl Playback {
    fn status(&mut self) -> Status {
        let playing = self.player.as_mut().map(Player::is_alive).unwrap_or(false);
        Status {
            available: self.player.is_some(),
            playing,
            channel: if playing {
                self.current.as_ref().map(|t| t.channel)
            } else {
                None
            },
            player: self.player.as_ref().map(|p| p.kind().as_str().to_string()),
            volume: self.volume,
            autoconnect: self.autoconnect,
        }
    }

    async fn stop(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.kill().await;
        }
        self.current = None;
    }
}

pub struct Backend {
    playback: Mutex<Playback>,
    now_playing: RwLock<NowPlaying>,
    streams: StreamsConfig,
    http: reqwest::Client,
}

impl Backend {
    pub fn new(kind: Option<PlayerKind>, config: &Config) -> Self {
        let player = kind.map(|k| Player::new(k, platform::mpv_socket_path()));
        Self {
            playback: Mutex::new(Playback {
                player,
                current: None,
                volume: config.daemon.default_volume.min(MAX_VOLUME),
                autoconnect: config.daemon.default_autoconnect,
            }),
            now_playing: RwLock::new(NowPlaying::default()),
            streams: config.streams.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn live_api_url(&self) -> &str {
        &self.streams.live_api_url
    }

    fn stream_url(&self, channel: Channel) -> &str {
        match channel {
            Channel::One => &self.streams.channel1_url,
            Channel::Two => &self.streams.channel2_url,
        }
    }

    // ── methods ───────────────────────────────────────────────────────────────

    pub async fn get_status(&self) -> Status {
        self.playback.lock().await.status()
    }

    pub async fn get_now_playing(&self) -> NowPlaying {
        self.now_playing.read().await.clone()
    }

    pub async fn set_now_playing(&self, np: NowPlaying) {
        *self.now_playing.write().await = np;
    }

    /// Tune to `channel`.  Re-selecting the channel that is already playing
    /// leaves the player alone.
    pub async fn play(&self, channel: Channel) -> Result<Status, BackendError> {
        let url = self.stream_url(channel).to_string();
        let mut pb = self.playback.lock().await;
        if pb.player.is_none() {
            return Err(BackendError::NoPlayer);
        }

        let status = pb.status();
        if status.playing && status.channel == Some(channel) {
            return Ok(status);
        }

        pb.stop().await;
        let volume = pb.volume;
        if let Some(player) = pb.player.as_mut() {
            player.spawn(&url, volume).await?;
        }
        pb.current = Some(Tuned { channel, url });
        info!("backend: playing channel {}", channel);
        Ok(pb.status())
    }

    pub async fn stop(&self) -> Status {
        let mut pb = self.playback.lock().await;
        pb.stop().await;
        info!("backend: stopped");
        pb.status()
    }

    pub async fn set_volume(&self, volume: i64) -> Status {
        let volume = volume.clamp(0, i64::from(MAX_VOLUME)) as u8;
        let mut pb = self.playback.lock().await;
        pb.volume = volume;
        if let Some(player) = pb.player.as_mut() {
            player.apply_volume(volume).await;
        }
        pb.status()
    }

    pub async fn set_autoconnect(&self, enabled: bool) -> Status {
        let mut pb = self.playback.lock().await;
        pb.autoconnect = enabled;
        pb.status()
    }

    // ── dispatch by name ──────────────────────────────────────────────────────

    pub async fn handle(&self, name: &str, args: Value) -> Result<Value, BackendError> {
        let method =
            Method::from_name(name).ok_or_else(|| BackendError::UnknownMethod(name.to_string()))?;

        let result = match method {
            Method::GetStatus => serde_json::to_value(self.get_status().await),
            Method::GetNowPlaying => serde_json::to_value(self.get_now_playing().await),
            Method::Play => {
                let a: PlayArgs = parse_args(method, args)?;
                serde_json::to_value(self.play(Channel::coerce(a.channel)).await?)
            }
            Method::Stop => serde_json::to_value(self.stop().await),
            Method::SetVolume => {
                let a: VolumeArgs = parse_args(method, args)?;
                serde_json::to_value(self.set_volume(a.volume).await)
            }
            Method::SetAutoconnect => {
                let a: AutoconnectArgs = parse_args(method, args)?;
                serde_json::to_value(self.set_autoconnect(a.enabled).await)
            }
        };
        result.map_err(|e| BackendError::Internal(e.into()))
    }

    // ── background ────────────────────────────────────────────────────────────

    /// Respawn a player that died while a channel was selected and
    /// autoconnect is on.
    pub async fn run_watchdog(self: Arc<Self>, token: CancellationToken, period: Duration) {
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tick.tick() => {}
            }
            if let Err(e) = self.revive().await {
                error!("watchdog: restart failed: {:#}", e);
            }
        }
        info!("watchdog: stopped");
    }

    async fn revive(&self) -> anyhow::Result<()> {
        let mut pb = self.playback.lock().await;
        let Playback {
            player,
            current,
            volume,
            autoconnect,
        } = &mut *pb;

        let (Some(player), Some(tuned)) = (player.as_mut(), current.as_ref()) else {
            return Ok(());
        };
        if !*autoconnect || player.is_alive() {
            return Ok(());
        }
        warn!("watchdog: player died, restarting channel {}", tuned.channel);
        player.spawn(&tuned.url, *volume).await
    }

    /// Shutdown path: leave nothing playing behind.
    pub async fn unload(&self) {
        self.stop().await;
    }
}

fn parse_args<T: DeserializeOwned>(method: Method, args: Value) -> Result<T, BackendError> {
    serde_json::from_value(args).map_err(|e| BackendError::InvalidArguments {
        method,
        message: e.to_string(),
    })
}
