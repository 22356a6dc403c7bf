use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::events::{
    IpcEvent, PATH_OBSERVER, PAUSE_OBSERVER, SPEED_OBSERVER, TIME_POS_OBSERVER, TimeCoalescer,
    claim_load, parse_ipc_event,
};
use super::process::restore_default_signals;
use super::{LoadTicket, MediaSurface, PlayerEvent, PlayerMode, UNTRACKED_LOAD};
use crate::config::PlayerConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PIP_WINDOW_SCALE: f64 = 0.4;

type PendingLoads = Arc<Mutex<VecDeque<(LoadTicket, String)>>>;

/// An mpv process controlled through its JSON IPC socket.
pub(crate) struct MpvPlayer {
    child: Child,
    writer: UnixStream,
    socket_path: PathBuf,
    /// `f64` bits, kept current by the reader from mpv's `speed` property.
    rate: Arc<AtomicU64>,
    pending_loads: PendingLoads,
    next_ticket: LoadTicket,
    pip_enabled: bool,
    pip_active: bool,
    autoplay: bool,
}

impl MpvPlayer {
    pub(crate) fn spawn(
        config: &PlayerConfig,
        mode: PlayerMode,
    ) -> Result<(Self, mpsc::Receiver<PlayerEvent>)> {
        let socket_path = ipc_socket_path();
        let mut cmd = ProcessCommand::new(&config.bin);
        cmd.arg("--no-terminal")
            .arg("--force-window=yes")
            .arg(format!("--input-ipc-server={}", socket_path.display()));
        match mode {
            PlayerMode::Persistent => cmd.arg("--idle=yes").arg("--keep-open=yes"),
            PlayerMode::SingleFile => cmd.arg("--idle=once"),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        restore_default_signals(&mut cmd);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to launch {}", config.bin.display()))?;
        let stream = match connect_with_retry(&socket_path, &mut child) {
            Ok(stream) => stream,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = fs::remove_file(&socket_path);
                return Err(err);
            }
        };
        let reader = stream
            .try_clone()
            .context("failed to clone mpv IPC stream")?;

        let (tx, rx) = mpsc::channel();
        let rate = Arc::new(AtomicU64::new(1.0_f64.to_bits()));
        let pending_loads = PendingLoads::default();
        let reader_state = ReaderState {
            rate: Arc::clone(&rate),
            pending_loads: Arc::clone(&pending_loads),
        };
        thread::spawn(move || read_events(reader, tx, reader_state));

        let mut player = Self {
            child,
            writer: stream,
            socket_path,
            rate,
            pending_loads,
            next_ticket: UNTRACKED_LOAD + 1,
            pip_enabled: config.pip_enabled,
            pip_active: false,
            autoplay: config.autoplay,
        };
        player.command(json!(["observe_property", TIME_POS_OBSERVER, "time-pos"]))?;
        player.command(json!(["observe_property", PAUSE_OBSERVER, "pause"]))?;
        player.command(json!(["observe_property", SPEED_OBSERVER, "speed"]))?;
        player.command(json!(["observe_property", PATH_OBSERVER, "path"]))?;
        debug!(socket = %player.socket_path.display(), "mpv ready");
        Ok((player, rx))
    }

    fn command(&mut self, args: Value) -> Result<()> {
        let mut line = json!({ "command": args }).to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .context("failed to send command to mpv")
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.command(json!(["set_property", name, value]))
    }

    fn pending_loads(&self) -> MutexGuard<'_, VecDeque<(LoadTicket, String)>> {
        self.pending_loads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaSurface for MpvPlayer {
    fn load(&mut self, source: &str, start_at: Option<f64>) -> Result<LoadTicket> {
        // `start` is a global option; it has to be reset for lessons
        // without saved progress.
        let start = start_at
            .map(|seconds| format!("{seconds}"))
            .unwrap_or_else(|| "none".to_string());
        self.set_property("start", json!(start))?;
        self.set_property("pause", json!(!self.autoplay))?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending_loads().push_back((ticket, source.to_string()));
        if let Err(err) = self.command(json!(["loadfile", source, "replace"])) {
            self.pending_loads().retain(|(pending, _)| *pending != ticket);
            return Err(err);
        }
        Ok(ticket)
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        self.set_property("time-pos", json!(seconds))
    }

    fn playback_rate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.set_property("speed", json!(rate))?;
        self.rate.store(rate.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<()> {
        self.command(json!(["cycle", "pause"]))
    }

    fn pip_supported(&self) -> bool {
        self.pip_enabled
    }

    fn pip_active(&self) -> bool {
        self.pip_active
    }

    fn request_pip(&mut self) -> Result<()> {
        self.set_property("ontop", json!(true))?;
        self.set_property("window-scale", json!(PIP_WINDOW_SCALE))?;
        self.pip_active = true;
        Ok(())
    }

    fn exit_pip(&mut self) -> Result<()> {
        self.set_property("ontop", json!(false))?;
        self.set_property("window-scale", json!(1.0))?;
        self.pip_active = false;
        Ok(())
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        let _ = self.command(json!(["quit"]));
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
                _ => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        let _ = fs::remove_file(&self.socket_path);
    }
}

fn ipc_socket_path() -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    env::temp_dir().join(format!("lessonview-mpv-{}-{ts}.sock", std::process::id()))
}

fn connect_with_retry(socket_path: &Path, child: &mut Child) -> Result<UnixStream> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if let Some(status) = child.try_wait().context("failed to poll mpv")? {
                    return Err(anyhow!("mpv exited before opening its IPC socket: {status}"));
                }
                if Instant::now() >= deadline {
                    return Err(anyhow!(
                        "timed out connecting to mpv IPC socket {}: {err}",
                        socket_path.display()
                    ));
                }
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

/// What the reader thread shares with the controlling `MpvPlayer`.
struct ReaderState {
    rate: Arc<AtomicU64>,
    pending_loads: PendingLoads,
}

fn read_events(stream: UnixStream, tx: mpsc::Sender<PlayerEvent>, state: ReaderState) {
    let mut coalescer = TimeCoalescer::default();
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("mpv IPC read failed: {err}");
                break;
            }
        };
        let Some(event) = parse_ipc_event(&line) else {
            continue;
        };
        let outgoing = match event {
            IpcEvent::Path(path) => {
                let ticket = claim_load(
                    &mut state
                        .pending_loads
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner),
                    &path,
                );
                debug!(ticket, "mpv switched file");
                // The tail of the previous file goes out before the switch.
                let mut events: Vec<_> = coalescer
                    .flush()
                    .map(PlayerEvent::TimeUpdate)
                    .into_iter()
                    .collect();
                coalescer.reset();
                events.push(PlayerEvent::Started(ticket));
                events
            }
            IpcEvent::Speed(rate) => {
                state.rate.store(rate.to_bits(), Ordering::Relaxed);
                Vec::new()
            }
            IpcEvent::TimePos(seconds) => coalescer
                .accept(seconds)
                .map(PlayerEvent::TimeUpdate)
                .into_iter()
                .collect(),
            IpcEvent::Paused => coalescer
                .flush()
                .map(PlayerEvent::TimeUpdate)
                .into_iter()
                .collect(),
            IpcEvent::Finished => {
                let mut events: Vec<_> = coalescer
                    .flush()
                    .map(PlayerEvent::TimeUpdate)
                    .into_iter()
                    .collect();
                events.push(PlayerEvent::Ended);
                events
            }
        };
        for event in outgoing {
            if tx.send(event).is_err() {
                return;
            }
        }
    }

    if let Some(seconds) = coalescer.flush() {
        let _ = tx.send(PlayerEvent::TimeUpdate(seconds));
    }
    let _ = tx.send(PlayerEvent::Closed);
}
