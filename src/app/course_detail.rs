use std::collections::VecDeque;

use anyhow::{Result, bail};
use tracing::{debug, warn};

use crate::models::{CourseDetail, Lesson};
use crate::player::{LoadTicket, MediaSurface, PlayerEvent, RATE_STEP, RateLimits, step_rate};
use crate::store::ProgressStore;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DetailState {
    Loading,
    Ready(CourseDetail),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    Activated,
    AlreadyActive,
    Locked,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RateKey {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipOutcome {
    Entered,
    Exited,
    Unsupported,
}

/// A position written to the progress store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SavedPosition {
    pub(crate) lesson_id: String,
    pub(crate) seconds: f64,
}

/// One course's screen: lesson list, active lesson, and the wiring between
/// player events and the progress store.
///
/// `active` is the lesson the user picked. Positions are saved for
/// `playing`, the lesson whose file the player last reported switching to,
/// so nothing reported for one file lands under another lesson's key.
#[derive(Debug, Clone)]
pub(crate) struct CourseDetailView {
    course_id: String,
    state: DetailState,
    active: Option<usize>,
    playing: Option<usize>,
    pending_loads: VecDeque<(LoadTicket, usize)>,
    limits: RateLimits,
}

impl CourseDetailView {
    pub(crate) fn new(course_id: impl Into<String>, limits: RateLimits) -> Self {
        Self {
            course_id: course_id.into(),
            state: DetailState::Loading,
            active: None,
            playing: None,
            pending_loads: VecDeque::new(),
            limits,
        }
    }

    pub(crate) fn course_id(&self) -> &str {
        &self.course_id
    }

    pub(crate) fn state(&self) -> &DetailState {
        &self.state
    }

    pub(crate) fn detail(&self) -> Option<&CourseDetail> {
        match &self.state {
            DetailState::Ready(detail) => Some(detail),
            DetailState::Loading | DetailState::Failed(_) => None,
        }
    }

    pub(crate) fn lessons(&self) -> &[Lesson] {
        self.detail()
            .map(|detail| detail.lessons.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub(crate) fn active_lesson(&self) -> Option<&Lesson> {
        self.lessons().get(self.active?)
    }

    /// The first lesson becomes active whatever its lock status; only later
    /// selections are gated.
    pub(crate) fn apply_loaded(&mut self, detail: CourseDetail) {
        self.active = (!detail.lessons.is_empty()).then_some(0);
        self.forget_player();
        self.state = DetailState::Ready(detail);
    }

    pub(crate) fn apply_failed(&mut self, message: String) {
        self.active = None;
        self.forget_player();
        self.state = DetailState::Failed(message);
    }

    /// Drops what is known about the player's files; the next player
    /// starts numbering its loads afresh.
    pub(crate) fn forget_player(&mut self) {
        self.playing = None;
        self.pending_loads.clear();
    }

    /// Puts the selection back on the lesson the player was last asked to
    /// show. Used when switching to the selected lesson failed.
    pub(crate) fn cancel_selection(&mut self) {
        if let Some(index) = self
            .pending_loads
            .back()
            .map(|(_, index)| *index)
            .or(self.playing)
        {
            self.active = Some(index);
        }
    }

    pub(crate) fn select_lesson(&mut self, index: usize) -> Selection {
        let Some(lesson) = self.lessons().get(index) else {
            return Selection::Missing;
        };
        if !lesson.is_unlocked() {
            debug!(lesson = %lesson.id, "ignoring selection of locked lesson");
            return Selection::Locked;
        }
        if self.active == Some(index) {
            return Selection::AlreadyActive;
        }
        self.active = Some(index);
        Selection::Activated
    }

    /// Saved position for the active lesson, when there is one worth
    /// seeking to.
    pub(crate) fn resume_position(&self, progress: &ProgressStore) -> Option<f64> {
        let lesson = self.active_lesson()?;
        match progress.load(&self.course_id, &lesson.id) {
            Ok(position) => position.filter(|seconds| *seconds > 0.0),
            Err(err) => {
                warn!(lesson = %lesson.id, "failed to read saved progress: {err:#}");
                None
            }
        }
    }

    /// Loads the active lesson into the surface, positioned at the saved
    /// progress before playback starts. Returns the resume position. On
    /// failure the selection returns to the lesson already in the player.
    pub(crate) fn start_active_playback(
        &mut self,
        surface: &mut dyn MediaSurface,
        progress: &ProgressStore,
    ) -> Result<Option<f64>> {
        let result = self.load_active(surface, progress);
        if result.is_err() {
            self.cancel_selection();
        }
        result
    }

    fn load_active(
        &mut self,
        surface: &mut dyn MediaSurface,
        progress: &ProgressStore,
    ) -> Result<Option<f64>> {
        let (Some(index), Some(lesson)) = (self.active, self.active_lesson()) else {
            bail!("course {} has no active lesson", self.course_id);
        };
        if lesson.link.trim().is_empty() {
            bail!("lesson \"{}\" has no media link", lesson.title);
        }
        let source = lesson.link.clone();
        let resume_at = self.resume_position(progress);
        let ticket = surface.load(&source, resume_at)?;
        self.pending_loads.push_back((ticket, index));
        debug!(course = %self.course_id, ticket, resume_at = ?resume_at, "loaded lesson into player");
        Ok(resume_at)
    }

    /// Until the player reports the switch, positions still belong to the
    /// previous file and are saved under its lesson.
    pub(crate) fn handle_player_event(
        &mut self,
        event: PlayerEvent,
        progress: &ProgressStore,
    ) -> Option<SavedPosition> {
        match event {
            PlayerEvent::Started(ticket) => {
                let found = self
                    .pending_loads
                    .iter()
                    .position(|(pending, _)| *pending == ticket);
                match found {
                    Some(found) => {
                        self.playing = Some(self.pending_loads[found].1);
                        self.pending_loads.drain(..=found);
                    }
                    None => {
                        debug!(ticket, "player switched to a file this view did not load");
                        self.playing = None;
                    }
                }
                None
            }
            PlayerEvent::TimeUpdate(seconds) => {
                let lesson_id = self.lessons().get(self.playing?)?.id.clone();
                match progress.save(&self.course_id, &lesson_id, seconds) {
                    Ok(()) => Some(SavedPosition { lesson_id, seconds }),
                    Err(err) => {
                        warn!(lesson = %lesson_id, "failed to save progress: {err:#}");
                        None
                    }
                }
            }
            PlayerEvent::Ended => None,
            PlayerEvent::Closed => {
                self.forget_player();
                None
            }
        }
    }

    pub(crate) fn adjust_rate(&self, surface: &mut dyn MediaSurface, key: RateKey) -> Result<f64> {
        let delta = match key {
            RateKey::Up => RATE_STEP,
            RateKey::Down => -RATE_STEP,
        };
        let rate = step_rate(surface.playback_rate(), delta, self.limits);
        surface.set_playback_rate(rate)?;
        Ok(rate)
    }

    pub(crate) fn toggle_pip(&self, surface: &mut dyn MediaSurface) -> Result<PipOutcome> {
        if !surface.pip_supported() {
            return Ok(PipOutcome::Unsupported);
        }
        if surface.pip_active() {
            surface.exit_pip()?;
            Ok(PipOutcome::Exited)
        } else {
            surface.request_pip()?;
            Ok(PipOutcome::Entered)
        }
    }
}
