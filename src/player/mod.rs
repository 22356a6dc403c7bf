mod events;
#[cfg(unix)]
mod mpv;
mod process;

use std::sync::mpsc;

use anyhow::Result;

use crate::config::PlayerConfig;

pub(crate) use process::with_sigint_ignored;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// The player switched to the file of the `load` call that returned
    /// this ticket; later positions belong to it. Files the player picked
    /// up on its own report `UNTRACKED_LOAD`.
    Started(LoadTicket),
    TimeUpdate(f64),
    Ended,
    /// The player process went away.
    Closed,
}

pub type LoadTicket = u64;

pub const UNTRACKED_LOAD: LoadTicket = 0;

/// The video surface the detail view drives. Decoding and streaming live
/// in the external player; this is only the control plane.
pub trait MediaSurface {
    fn load(&mut self, source: &str, start_at: Option<f64>) -> Result<LoadTicket>;
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64) -> Result<()>;
    fn toggle_pause(&mut self) -> Result<()>;
    fn pip_supported(&self) -> bool;
    fn pip_active(&self) -> bool;
    fn request_pip(&mut self) -> Result<()>;
    fn exit_pip(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMode {
    /// Stays open between lessons (TUI).
    Persistent,
    /// Exits once the loaded file ends or the window closes (`play`).
    SingleFile,
}

pub type LaunchedPlayer = (Box<dyn MediaSurface>, mpsc::Receiver<PlayerEvent>);

#[cfg(unix)]
pub fn launch(config: &PlayerConfig, mode: PlayerMode) -> Result<LaunchedPlayer> {
    let (player, events) = mpv::MpvPlayer::spawn(config, mode)?;
    Ok((Box::new(player), events))
}

#[cfg(not(unix))]
pub fn launch(_config: &PlayerConfig, _mode: PlayerMode) -> Result<LaunchedPlayer> {
    anyhow::bail!("mpv IPC control is only available on unix platforms")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimits {
    pub min: f64,
    pub max: f64,
}

impl From<&PlayerConfig> for RateLimits {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            min: config.min_rate,
            max: config.max_rate,
        }
    }
}

pub const RATE_STEP: f64 = 0.1;

/// Applies one rate keypress. Rounded to a tenth so repeated steps do not
/// drift, then clamped.
pub fn step_rate(current: f64, delta: f64, limits: RateLimits) -> f64 {
    let stepped = ((current + delta) * 10.0).round() / 10.0;
    stepped.clamp(limits.min, limits.max)
}
