//! External audio player management.
//!
//! The daemon never decodes audio itself.  It launches a command-line player
//! on the stream URL, keeps the child handle to answer "is it still playing",
//! and tears the whole process group down on stop.  When the player is mpv,
//! volume changes are pushed live over its JSON IPC socket.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::io::AsyncWriteExt;
#[cfg(unix)]
use tokio::net::UnixStream;

use remote_proto::platform::find_on_path;

const IPC_TIMEOUT: Duration = Duration::from_millis(250);
const TERM_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Mpv,
    MpvFlatpak,
    VlcFlatpak,
}

impl PlayerKind {
    /// Name reported in `Status::player`.
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerKind::Mpv => "mpv",
            PlayerKind::MpvFlatpak => "mpv_flatpak",
            PlayerKind::VlcFlatpak => "vlc_flatpak",
        }
    }

    pub fn supports_ipc(self) -> bool {
        matches!(self, PlayerKind::Mpv | PlayerKind::MpvFlatpak)
    }

    fn program(self) -> (&'static str, &'static [&'static str]) {
        const MPV: &[&str] = &[];
        const MPV_FLATPAK: &[&str] = &["run", "io.mpv.Mpv"];
        const VLC_FLATPAK: &[&str] = &["run", "org.videolan.VLC"];
        match self {
            PlayerKind::Mpv => ("mpv", MPV),
            PlayerKind::MpvFlatpak => ("flatpak", MPV_FLATPAK),
            PlayerKind::VlcFlatpak => ("flatpak", VLC_FLATPAK),
        }
    }

    /// Full argument list after the program name.
    pub fn args(self, url: &str, volume: u8, ipc_path: &Path) -> Vec<String> {
        let (_, prefix) = self.program();
        let mut args: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        if self.supports_ipc() {
            args.extend([
                "--no-video".to_string(),
                "--keep-open=no".to_string(),
                "--really-quiet".to_string(),
                "--title=NTS Radio".to_string(),
                format!("--volume={}", volume),
                format!("--input-ipc-server={}", ipc_path.display()),
            ]);
        } else {
            args.extend([
                "--intf".to_string(),
                "dummy".to_string(),
                "--no-video".to_string(),
                "--quiet".to_string(),
            ]);
        }
        args.push(url.to_string());
        args
    }
}

impl std::fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the first usable player: mpv on `PATH`, then the mpv and VLC
/// Flatpaks.
pub async fn detect() -> Option<PlayerKind> {
    if find_on_path("mpv").is_some() {
        return Some(PlayerKind::Mpv);
    }
    if flatpak_installed("io.mpv.Mpv").await {
        return Some(PlayerKind::MpvFlatpak);
    }
    if flatpak_installed("org.videolan.VLC").await {
        return Some(PlayerKind::VlcFlatpak);
    }
    None
}

async fn flatpak_installed(app_id: &str) -> bool {
    if find_on_path("flatpak").is_none() {
        return false;
    }
    Command::new("flatpak")
        .args(["info", app_id])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// One player slot.  At most one child process is alive at a time.
pub struct Player {
    kind: PlayerKind,
    ipc_path: PathBuf,
    child: Option<Child>,
}

impl Player {
    pub fn new(kind: PlayerKind, ipc_path: PathBuf) -> Self {
        Self {
            kind,
            ipc_path,
            child: None,
        }
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Launch the player on `url`.  Any previous child is dropped without
    /// being signalled; callers stop it first.
    pub async fn spawn(&mut self, url: &str, volume: u8) -> anyhow::Result<()> {
        remove_socket(&self.ipc_path).await;
        if let Some(dir) = self.ipc_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let (program, _) = self.kind.program();
        let args = self.kind.args(url, volume, &self.ipc_path);
        info!("player: starting {} {:?}", program, args);

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group, so a flatpak wrapper and its sandboxed child go
        // down together.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to launch {}", program))?;
        self.child = Some(child);
        Ok(())
    }

    /// Terminate the player process group and forget the child.
    pub async fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                terminate(&mut child).await;
                if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
                    warn!("player: did not exit after SIGTERM, killing");
                    let _ = child.kill().await;
                }
            }
        }
        remove_socket(&self.ipc_path).await;
    }

    /// Push `volume` to a running mpv.  Returns false when there is nothing
    /// to talk to or the socket did not answer in time.
    pub async fn apply_volume(&mut self, volume: u8) -> bool {
        if !self.kind.supports_ipc() || !self.is_alive() || !self.ipc_path.exists() {
            return false;
        }
        match tokio::time::timeout(IPC_TIMEOUT, send_volume(&self.ipc_path, volume)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("player: ipc volume failed: {}", e);
                false
            }
            Err(_) => {
                debug!("player: ipc volume timed out");
                false
            }
        }
    }
}

#[cfg(unix)]
async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // negative pid addresses the whole group
    let sent = Command::new("kill")
        .arg("-TERM")
        .arg("--")
        .arg(format!("-{}", pid))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if !matches!(sent, Ok(s) if s.success()) {
        warn!("player: kill -TERM -{} failed, signalling child only", pid);
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

#[cfg(unix)]
async fn send_volume(path: &Path, volume: u8) -> std::io::Result<()> {
    let mut line = serde_json::json!({ "command": ["set_property", "volume", volume] }).to_string();
    line.push('\n');
    let mut stream = UnixStream::connect(path).await?;
    stream.write_all(line.as_bytes()).await?;
    stream.shutdown().await
}

#[cfg(not(unix))]
async fn send_volume(_path: &Path, _volume: u8) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mpv ipc needs unix sockets",
    ))
}

async fn remove_socket(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}
