mod actions;
mod render;
mod session;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;
use tracing::info;

use crate::models::{Course, CourseDetail};
use crate::player::{MediaSurface, PlayerEvent};

use super::course_detail::{CourseDetailView, DetailState, PipOutcome, RateKey, Selection};
use super::course_list::CourseListView;
use super::{AppContext, Route};

use self::actions::{
    drain_fetch_results, drain_player_events, mount, refetch, start_playback, status_error,
    status_info,
};
use self::render::draw_tui;
use self::session::TerminalSession;

pub(super) struct CatalogScreen {
    pub(super) view: CourseListView,
    pub(super) table_state: TableState,
    pub(super) generation: u64,
}

pub(super) struct PlayerHandle {
    pub(super) surface: Box<dyn MediaSurface>,
    pub(super) events: mpsc::Receiver<PlayerEvent>,
}

pub(super) struct CourseScreen {
    pub(super) view: CourseDetailView,
    pub(super) table_state: TableState,
    pub(super) generation: u64,
    pub(super) player: Option<PlayerHandle>,
    pub(super) saved_positions: HashMap<String, f64>,
}

pub(super) enum Screen {
    Catalog(CatalogScreen),
    Course(CourseScreen),
}

impl Screen {
    pub(super) fn generation(&self) -> u64 {
        match self {
            Self::Catalog(catalog) => catalog.generation,
            Self::Course(course) => course.generation,
        }
    }

    pub(super) fn route(&self) -> Route {
        match self {
            Self::Catalog(_) => Route::Catalog,
            Self::Course(course) => Route::Course(course.view.course_id().to_string()),
        }
    }
}

/// Background fetch results, tagged with the generation of the screen that
/// asked for them.
#[derive(Debug)]
pub(super) enum FetchResult {
    Catalog {
        generation: u64,
        result: Result<Vec<Course>, String>,
    },
    Course {
        generation: u64,
        result: Result<CourseDetail, String>,
    },
}

impl FetchResult {
    pub(super) fn generation(&self) -> u64 {
        match self {
            Self::Catalog { generation, .. } | Self::Course { generation, .. } => *generation,
        }
    }
}

pub(crate) fn run_tui(ctx: &AppContext) -> Result<()> {
    let _session = TerminalSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let (fetch_tx, fetch_rx) = mpsc::channel::<FetchResult>();
    let mut generation = 1_u64;
    let mut screen = mount(Route::Catalog, ctx, generation, &fetch_tx);
    let mut status = status_info("Loading courses...");

    loop {
        drain_fetch_results(&fetch_rx, &mut screen, ctx, &mut status);
        if let Screen::Course(course) = &mut screen
            && let Some(message) = drain_player_events(course, &ctx.progress)
        {
            status = message;
        }

        terminal.draw(|frame| draw_tui(frame, &mut screen, &status))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('q') {
            break;
        }

        let mut navigate_to = None::<Route>;
        let mut reload = false;
        match &mut screen {
            Screen::Catalog(catalog) => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    if let Some(selected) = catalog.table_state.selected() {
                        catalog.table_state.select(Some(selected.saturating_sub(1)));
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let rows = catalog.view.page_items().len();
                    if let Some(selected) = catalog.table_state.selected()
                        && rows > 0
                    {
                        catalog
                            .table_state
                            .select(Some((selected + 1).min(rows - 1)));
                    }
                }
                KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => {
                    if catalog.view.prev_page() {
                        catalog.table_state.select(Some(0));
                    }
                }
                KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => {
                    if catalog.view.next_page() {
                        catalog.table_state.select(Some(0));
                    }
                }
                KeyCode::Enter => {
                    navigate_to = catalog
                        .table_state
                        .selected()
                        .and_then(|selected| catalog.view.route_for(selected));
                }
                KeyCode::Char('r') => reload = true,
                _ => {}
            },
            Screen::Course(course) => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    navigate_to = Some(Route::Catalog);
                }
                KeyCode::Char('k') => {
                    if let Some(selected) = course.table_state.selected() {
                        course.table_state.select(Some(selected.saturating_sub(1)));
                    }
                }
                KeyCode::Char('j') => {
                    let rows = course.view.lessons().len();
                    if let Some(selected) = course.table_state.selected()
                        && rows > 0
                    {
                        course
                            .table_state
                            .select(Some((selected + 1).min(rows - 1)));
                    }
                }
                KeyCode::Enter => {
                    let Some(selected) = course.table_state.selected() else {
                        continue;
                    };
                    status = match course.view.select_lesson(selected) {
                        Selection::Activated => playback_status(start_playback(course, ctx)),
                        Selection::AlreadyActive if course.player.is_none() => {
                            playback_status(start_playback(course, ctx))
                        }
                        Selection::AlreadyActive => status_info("Lesson already playing."),
                        Selection::Locked => status_info("Lesson is locked."),
                        Selection::Missing => status,
                    };
                }
                KeyCode::Up | KeyCode::Down => {
                    let rate_key = if key.code == KeyCode::Up {
                        RateKey::Up
                    } else {
                        RateKey::Down
                    };
                    status = match course.player.as_mut() {
                        Some(handle) => {
                            match course.view.adjust_rate(handle.surface.as_mut(), rate_key) {
                                Ok(rate) => status_info(&format!("Playback rate {rate:.1}x")),
                                Err(err) => status_error(&format!("Rate change failed: {err}")),
                            }
                        }
                        None => status_error("No player open."),
                    };
                }
                KeyCode::Char('p') => {
                    status = match course.player.as_mut() {
                        Some(handle) => match course.view.toggle_pip(handle.surface.as_mut()) {
                            Ok(PipOutcome::Entered) => status_info("Picture-in-picture on."),
                            Ok(PipOutcome::Exited) => status_info("Picture-in-picture off."),
                            Ok(PipOutcome::Unsupported) => {
                                status_info("Picture-in-picture is not available.")
                            }
                            Err(err) => {
                                status_error(&format!("Picture-in-picture failed: {err}"))
                            }
                        },
                        None => status_error("No player open."),
                    };
                }
                KeyCode::Char(' ') => {
                    if let Some(handle) = course.player.as_mut()
                        && let Err(err) = handle.surface.toggle_pause()
                    {
                        status = status_error(&format!("Pause failed: {err}"));
                    }
                }
                KeyCode::Char('0') => {
                    status = match course.player.as_mut() {
                        Some(handle) => match handle.surface.set_current_time(0.0) {
                            Ok(()) => status_info("Restarted lesson."),
                            Err(err) => status_error(&format!("Seek failed: {err}")),
                        },
                        None => status_error("No player open."),
                    };
                }
                KeyCode::Char('r') => {
                    if matches!(course.view.state(), DetailState::Failed(_)) {
                        navigate_to = Some(Route::Course(course.view.course_id().to_string()));
                    }
                }
                _ => {}
            },
        }

        if reload {
            refetch(&screen, ctx, &fetch_tx);
            status = status_info("Reloading courses...");
        }

        if let Some(route) = navigate_to {
            info!(route = %route.path(), "navigating");
            generation += 1;
            screen = mount(route, ctx, generation, &fetch_tx);
            status = match &screen {
                Screen::Catalog(_) => status_info("Loading courses..."),
                Screen::Course(_) => status_info("Loading course..."),
            };
        }
    }

    terminal.show_cursor()?;
    Ok(())
}

fn playback_status(result: Result<String>) -> String {
    match result {
        Ok(message) => status_info(&message),
        Err(err) => status_error(&format!("Playback failed: {err:#}")),
    }
}
