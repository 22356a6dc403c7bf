use std::collections::VecDeque;

use serde_json::Value;

use super::{LoadTicket, UNTRACKED_LOAD};

pub(crate) const TIME_POS_OBSERVER: u64 = 1;
pub(crate) const PAUSE_OBSERVER: u64 = 2;
pub(crate) const SPEED_OBSERVER: u64 = 3;
pub(crate) const PATH_OBSERVER: u64 = 4;

/// The subset of mpv JSON IPC messages the viewer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum IpcEvent {
    TimePos(f64),
    Paused,
    Speed(f64),
    /// The current file changed. Positions seen after it belong to `path`.
    Path(String),
    /// `end-file` with reason `eof`; replacements and stops are not ends.
    Finished,
}

pub(crate) fn parse_ipc_event(line: &str) -> Option<IpcEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    match value.get("event")?.as_str()? {
        "property-change" => match value.get("name")?.as_str()? {
            "time-pos" => value
                .get("data")?
                .as_f64()
                .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
                .map(IpcEvent::TimePos),
            "pause" => value
                .get("data")?
                .as_bool()
                .filter(|paused| *paused)
                .map(|_| IpcEvent::Paused),
            "speed" => value
                .get("data")?
                .as_f64()
                .filter(|rate| rate.is_finite() && *rate > 0.0)
                .map(IpcEvent::Speed),
            "path" => value
                .get("data")?
                .as_str()
                .map(|path| IpcEvent::Path(path.to_string())),
            _ => None,
        },
        "end-file" => (value.get("reason").and_then(Value::as_str) == Some("eof"))
            .then_some(IpcEvent::Finished),
        _ => None,
    }
}

/// Matches a file the player switched to against the loads still in
/// flight. Loads queued before the match were replaced before they started.
pub(crate) fn claim_load(pending: &mut VecDeque<(LoadTicket, String)>, path: &str) -> LoadTicket {
    let Some(index) = pending.iter().position(|(_, source)| source == path) else {
        return UNTRACKED_LOAD;
    };
    let ticket = pending[index].0;
    pending.drain(..=index);
    ticket
}

const MIN_EMIT_STEP: f64 = 0.25;

/// mpv reports `time-pos` on every frame; this keeps one update per
/// quarter second of media time and remembers the latest position so it can
/// be flushed when playback pauses or stops.
#[derive(Debug, Default)]
pub(crate) struct TimeCoalescer {
    last_emitted: Option<f64>,
    last_seen: Option<f64>,
}

impl TimeCoalescer {
    pub(crate) fn accept(&mut self, seconds: f64) -> Option<f64> {
        self.last_seen = Some(seconds);
        let due = match self.last_emitted {
            Some(previous) => (seconds - previous).abs() >= MIN_EMIT_STEP,
            None => true,
        };
        if due {
            self.last_emitted = Some(seconds);
            Some(seconds)
        } else {
            None
        }
    }

    pub(crate) fn flush(&mut self) -> Option<f64> {
        let seen = self.last_seen?;
        if self.last_emitted == Some(seen) {
            return None;
        }
        self.last_emitted = Some(seen);
        Some(seen)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_pos_changes() {
        let line = r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#;
        assert_eq!(parse_ipc_event(line), Some(IpcEvent::TimePos(12.5)));

        let idle = r#"{"event":"property-change","id":1,"name":"time-pos","data":null}"#;
        assert_eq!(parse_ipc_event(idle), None);
    }

    #[test]
    fn only_pausing_is_reported() {
        let paused = r#"{"event":"property-change","id":2,"name":"pause","data":true}"#;
        let resumed = r#"{"event":"property-change","id":2,"name":"pause","data":false}"#;
        assert_eq!(parse_ipc_event(paused), Some(IpcEvent::Paused));
        assert_eq!(parse_ipc_event(resumed), None);
    }

    #[test]
    fn end_file_counts_only_for_eof() {
        let eof = r#"{"event":"end-file","reason":"eof","playlist_entry_id":1}"#;
        let replaced = r#"{"event":"end-file","reason":"stop","playlist_entry_id":1}"#;
        assert_eq!(parse_ipc_event(eof), Some(IpcEvent::Finished));
        assert_eq!(parse_ipc_event(replaced), None);
        assert_eq!(parse_ipc_event(r#"{"event":"file-loaded"}"#), None);
    }

    #[test]
    fn parses_path_changes() {
        let line = r#"{"event":"property-change","id":4,"name":"path","data":"https://cdn.test/a.m3u8"}"#;
        assert_eq!(
            parse_ipc_event(line),
            Some(IpcEvent::Path("https://cdn.test/a.m3u8".to_string()))
        );
        let between = r#"{"event":"property-change","id":4,"name":"path"}"#;
        assert_eq!(parse_ipc_event(between), None);
    }

    #[test]
    fn claiming_a_load_drops_skipped_ones() {
        let mut pending = VecDeque::from(vec![
            (1, "a".to_string()),
            (2, "b".to_string()),
            (3, "c".to_string()),
        ]);
        assert_eq!(claim_load(&mut pending, "c"), 3);
        assert!(pending.is_empty());

        pending.push_back((4, "d".to_string()));
        assert_eq!(claim_load(&mut pending, "elsewhere"), UNTRACKED_LOAD);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn parses_speed_changes() {
        let line = r#"{"event":"property-change","id":3,"name":"speed","data":1.5}"#;
        assert_eq!(parse_ipc_event(line), Some(IpcEvent::Speed(1.5)));
        let zero = r#"{"event":"property-change","id":3,"name":"speed","data":0}"#;
        assert_eq!(parse_ipc_event(zero), None);
    }

    #[test]
    fn ignores_replies_and_garbage() {
        assert_eq!(parse_ipc_event(r#"{"request_id":0,"error":"success"}"#), None);
        assert_eq!(parse_ipc_event("not json"), None);
    }

    #[test]
    fn coalescer_thins_updates_and_flushes_tail() {
        let mut coalescer = TimeCoalescer::default();
        assert_eq!(coalescer.accept(10.0), Some(10.0));
        assert_eq!(coalescer.accept(10.1), None);
        assert_eq!(coalescer.accept(10.2), None);
        assert_eq!(coalescer.accept(10.3), Some(10.3));
        assert_eq!(coalescer.accept(10.4), None);

        assert_eq!(coalescer.flush(), Some(10.4));
        assert_eq!(coalescer.flush(), None);
    }

    #[test]
    fn coalescer_emits_backward_seeks() {
        let mut coalescer = TimeCoalescer::default();
        coalescer.accept(100.0);
        assert_eq!(coalescer.accept(5.0), Some(5.0));

        coalescer.reset();
        assert_eq!(coalescer.flush(), None);
    }
}
