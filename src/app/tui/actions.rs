use std::collections::HashMap;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};
use ratatui::widgets::TableState;
use tracing::{debug, warn};

use crate::config::PlayerConfig;
use crate::http::ApiClient;
use crate::player::{self, PlayerEvent, PlayerMode, RateLimits};
use crate::store::ProgressStore;

use super::super::course_detail::CourseDetailView;
use super::super::course_list::CourseListView;
use super::super::format::format_position;
use super::super::{AppContext, Route};
use super::{CatalogScreen, CourseScreen, FetchResult, PlayerHandle, Screen};

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Builds the screen for `route` and starts its fetch. Dropping the
/// previous screen is the unmount: its player quits and its late results
/// no longer match the generation.
pub(super) fn mount(
    route: Route,
    ctx: &AppContext,
    generation: u64,
    tx: &mpsc::Sender<FetchResult>,
) -> Screen {
    match route {
        Route::Catalog => {
            spawn_catalog_fetch(Arc::clone(&ctx.api), generation, tx.clone());
            Screen::Catalog(CatalogScreen {
                view: CourseListView::new(ctx.config.page_size),
                table_state: TableState::default(),
                generation,
            })
        }
        Route::Course(course_id) => {
            spawn_course_fetch(
                Arc::clone(&ctx.api),
                course_id.clone(),
                generation,
                tx.clone(),
            );
            Screen::Course(CourseScreen {
                view: CourseDetailView::new(course_id, RateLimits::from(&ctx.config.player)),
                table_state: TableState::default(),
                generation,
                player: None,
                saved_positions: HashMap::new(),
            })
        }
    }
}

pub(super) fn refetch(screen: &Screen, ctx: &AppContext, tx: &mpsc::Sender<FetchResult>) {
    match screen {
        Screen::Catalog(catalog) => {
            spawn_catalog_fetch(Arc::clone(&ctx.api), catalog.generation, tx.clone());
        }
        Screen::Course(course) => spawn_course_fetch(
            Arc::clone(&ctx.api),
            course.view.course_id().to_string(),
            course.generation,
            tx.clone(),
        ),
    }
}

fn spawn_catalog_fetch(api: Arc<ApiClient>, generation: u64, tx: mpsc::Sender<FetchResult>) {
    std::thread::spawn(move || {
        let result = api.list_courses().map_err(|err| err.to_string());
        let _ = tx.send(FetchResult::Catalog { generation, result });
    });
}

fn spawn_course_fetch(
    api: Arc<ApiClient>,
    course_id: String,
    generation: u64,
    tx: mpsc::Sender<FetchResult>,
) {
    std::thread::spawn(move || {
        let result = api.course_detail(&course_id).map_err(|err| err.to_string());
        let _ = tx.send(FetchResult::Course { generation, result });
    });
}

pub(super) fn drain_fetch_results(
    rx: &mpsc::Receiver<FetchResult>,
    screen: &mut Screen,
    ctx: &AppContext,
    status: &mut String,
) {
    while let Ok(fetched) = rx.try_recv() {
        let generation = fetched.generation();
        if generation != screen.generation() {
            debug!(generation, "dropping fetch result for an unmounted screen");
            continue;
        }

        match (fetched, &mut *screen) {
            (FetchResult::Catalog { result, .. }, Screen::Catalog(catalog)) => match result {
                Ok(courses) => {
                    let count = courses.len();
                    catalog.view.apply_loaded(courses);
                    let rows = catalog.view.page_items().len();
                    let selected = catalog.table_state.selected().unwrap_or(0);
                    catalog
                        .table_state
                        .select((rows > 0).then(|| selected.min(rows - 1)));
                    *status = if count == 0 {
                        status_info("No courses available.")
                    } else {
                        status_info(&format!("Loaded {count} courses."))
                    };
                }
                Err(err) => {
                    *status = status_error(&format!("Failed to load courses: {err}"));
                    catalog.view.apply_failed(err);
                }
            },
            (FetchResult::Course { result, .. }, Screen::Course(course)) => match result {
                Ok(detail) => {
                    course.view.apply_loaded(detail);
                    refresh_saved_positions(course, &ctx.progress);
                    course
                        .table_state
                        .select((!course.view.lessons().is_empty()).then_some(0));
                    *status = if course.view.active_lesson().is_none() {
                        status_info("This course has no lessons.")
                    } else {
                        match start_playback(course, ctx) {
                            Ok(message) => status_info(&message),
                            Err(err) => status_error(&format!("Playback failed: {err:#}")),
                        }
                    };
                }
                Err(err) => {
                    *status = status_error(&format!("Failed to load course: {err}"));
                    course.view.apply_failed(err);
                }
            },
            _ => debug!("fetch result does not match the mounted screen"),
        }
    }
}

fn refresh_saved_positions(course: &mut CourseScreen, progress: &ProgressStore) {
    course.saved_positions.clear();
    let course_id = course.view.course_id().to_string();
    for lesson in course.view.lessons() {
        match progress.load(&course_id, &lesson.id) {
            Ok(Some(seconds)) => {
                course.saved_positions.insert(lesson.id.clone(), seconds);
            }
            Ok(None) => {}
            Err(err) => warn!(lesson = %lesson.id, "failed to read saved progress: {err:#}"),
        }
    }
}

fn ensure_player<'a>(
    slot: &'a mut Option<PlayerHandle>,
    config: &PlayerConfig,
) -> Result<&'a mut PlayerHandle> {
    if slot.is_none() {
        let (surface, events) = player::launch(config, PlayerMode::Persistent)?;
        *slot = Some(PlayerHandle { surface, events });
    }
    slot.as_mut().context("player is not running")
}

/// Loads the active lesson, launching the player window on first use.
pub(super) fn start_playback(course: &mut CourseScreen, ctx: &AppContext) -> Result<String> {
    let handle = match ensure_player(&mut course.player, &ctx.config.player) {
        Ok(handle) => handle,
        Err(err) => {
            course.view.cancel_selection();
            return Err(err);
        }
    };
    let resume_at = course
        .view
        .start_active_playback(handle.surface.as_mut(), &ctx.progress)?;
    let title = course
        .view
        .active_lesson()
        .map(|lesson| lesson.title.clone())
        .unwrap_or_default();
    Ok(match resume_at {
        Some(seconds) => format!("Playing {title} from {}", format_position(seconds)),
        None => format!("Loaded {title}"),
    })
}

pub(super) fn drain_player_events(
    course: &mut CourseScreen,
    progress: &ProgressStore,
) -> Option<String> {
    let handle = course.player.as_ref()?;
    let mut status = None;
    let mut closed = false;
    loop {
        let event = match handle.events.try_recv() {
            Ok(event) => event,
            Err(mpsc::TryRecvError::Empty) => break,
            Err(mpsc::TryRecvError::Disconnected) => {
                closed = true;
                break;
            }
        };
        if let Some(saved) = course.view.handle_player_event(event, progress) {
            course.saved_positions.insert(saved.lesson_id, saved.seconds);
        }
        match event {
            PlayerEvent::Ended => status = Some(status_info("Lesson finished.")),
            PlayerEvent::Closed => {
                closed = true;
                break;
            }
            PlayerEvent::Started(_) | PlayerEvent::TimeUpdate(_) => {}
        }
    }

    if closed {
        course.player = None;
        course.view.forget_player();
        status = Some(status_info("Player closed. Press Enter to reopen."));
    }
    status
}
