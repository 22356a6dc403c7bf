mod course_detail;
mod course_list;
mod format;
mod pagination;
mod tui;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::http::ApiClient;
use crate::logging::{LogTarget, init_logging};
use crate::paths::{database_file_path, log_file_path};
use crate::player::{self, PlayerEvent, PlayerMode, RateLimits, with_sigint_ignored};
use crate::store::{KeyValueStore, MemoryStore, ProgressStore, SqliteStore, TokenStore};

use self::course_detail::{CourseDetailView, Selection};
use self::course_list::CourseListView;
use self::format::{format_position, format_rating, format_saved, truncate};

/// The two places a user can be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Catalog,
    Course(String),
}

impl Route {
    pub(crate) fn path(&self) -> String {
        match self {
            Self::Catalog => "/".to_string(),
            Self::Course(id) => format!("/course/{id}"),
        }
    }
}

pub(crate) struct AppContext {
    pub(crate) api: Arc<ApiClient>,
    pub(crate) progress: ProgressStore,
    pub(crate) config: Config,
}

pub fn run(cli: Cli) -> Result<()> {
    let interactive = matches!(cli.command, Some(Command::Tui) | None);
    if interactive {
        let log_path = log_file_path()?;
        init_logging(&cli.log_level, LogTarget::File(&log_path))?;
    } else {
        init_logging(&cli.log_level, LogTarget::Stderr)?;
    }

    let config = Config::from_env(&cli);
    let ctx = open_context(config)?;

    match cli.command {
        Some(Command::Courses { page }) => run_courses(&ctx, page)?,
        Some(Command::Course { id }) => run_course(&ctx, &id)?,
        Some(Command::Play { course_id, lesson }) => {
            run_play(&ctx, &course_id, lesson.as_deref())?
        }
        Some(Command::Logout) => run_logout(&ctx)?,
        Some(Command::Tui) | None => tui::run_tui(&ctx)?,
    }

    Ok(())
}

fn open_context(config: Config) -> Result<AppContext> {
    let backend: Arc<dyn KeyValueStore> = if config.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let db_path = database_file_path()?;
        let db = SqliteStore::open(&db_path)?;
        db.migrate()?;
        Arc::new(db)
    };

    let tokens = TokenStore::new(Arc::clone(&backend));
    let api = Arc::new(ApiClient::new(config.api.clone(), tokens));
    Ok(AppContext {
        api,
        progress: ProgressStore::new(backend),
        config,
    })
}

fn run_courses(ctx: &AppContext, page: usize) -> Result<()> {
    let courses = ctx.api.list_courses().context("failed to load course catalog")?;
    let mut view = CourseListView::new(ctx.config.page_size);
    view.apply_loaded(courses);

    if view.courses().is_empty() {
        println!("No courses available.");
        return Ok(());
    }
    view.set_page(page);
    if view.page() != page {
        println!("Page {page} does not exist; showing page {}.\n", view.page());
    }

    println!(
        "{:<38} {:<44} {:>7} {:>6} {:>6}",
        "ID", "TITLE", "LESSONS", "SKILLS", "RATING"
    );
    for course in view.page_items() {
        println!(
            "{:<38} {:<44} {:>7} {:>6} {:>6}",
            truncate(&course.id, 38),
            truncate(&course.title, 44),
            course.lessons_count,
            course.skills_count(),
            format_rating(course.rating)
        );
    }
    println!("\nPage {} of {}", view.page(), view.page_count());
    Ok(())
}

fn run_course(ctx: &AppContext, course_id: &str) -> Result<()> {
    let detail = ctx
        .api
        .course_detail(course_id)
        .with_context(|| format!("failed to load course {course_id}"))?;

    println!("{}", detail.course.title);
    if let Some(description) = detail.course.description.as_deref() {
        println!("  {}", description.trim());
    }
    if !detail.course.meta.skills.is_empty() {
        println!("  Skills: {}", detail.course.meta.skills.join(", "));
    }
    if !detail.course.tags.is_empty() {
        println!("  Tags: {}", detail.course.tags.join(", "));
    }
    if let Some(launched) = detail.course.launch_date.as_deref() {
        println!("  Launched: {launched}");
    }
    if let Some(preview) = detail.course.meta.course_video_preview.as_ref() {
        println!("  Trailer: {}", preview.link);
    }
    println!();

    if detail.lessons.is_empty() {
        println!("This course has no lessons.");
        return Ok(());
    }

    println!(
        "{:<4} {:<38} {:<48} {:<9} {:>9} {:>9}",
        "#", "LESSON ID", "TITLE", "STATUS", "SAVED", "LENGTH"
    );
    for lesson in &detail.lessons {
        let saved = ctx.progress.load(course_id, &lesson.id)?;
        let status = if lesson.is_unlocked() { "open" } else { "locked" };
        println!(
            "{:<4} {:<38} {:<48} {:<9} {:>9} {:>9}",
            lesson.order,
            truncate(&lesson.id, 38),
            truncate(&lesson.title, 48),
            status,
            format_saved(saved),
            format_saved(lesson.duration)
        );
    }
    Ok(())
}

fn run_play(ctx: &AppContext, course_id: &str, lesson_id: Option<&str>) -> Result<()> {
    let detail = ctx
        .api
        .course_detail(course_id)
        .with_context(|| format!("failed to load course {course_id}"))?;
    let mut view = CourseDetailView::new(course_id, RateLimits::from(&ctx.config.player));
    view.apply_loaded(detail);

    if let Some(lesson_id) = lesson_id {
        let index = view
            .lessons()
            .iter()
            .position(|lesson| lesson.id == lesson_id)
            .with_context(|| format!("course {course_id} has no lesson {lesson_id}"))?;
        if view.select_lesson(index) == Selection::Locked {
            bail!("lesson {lesson_id} is locked");
        }
    }
    let title = view
        .active_lesson()
        .map(|lesson| lesson.title.clone())
        .context("course has no lessons to play")?;

    with_sigint_ignored(|| {
        let (mut surface, events) = player::launch(&ctx.config.player, PlayerMode::SingleFile)?;
        let resume_at = view.start_active_playback(surface.as_mut(), &ctx.progress)?;
        println!("Playing: {title}");
        if let Some(seconds) = resume_at {
            println!("  Resuming at {}", format_position(seconds));
        }

        let mut last_saved = None;
        for event in events.iter() {
            if let Some(saved) = view.handle_player_event(event, &ctx.progress) {
                last_saved = Some(saved.seconds);
            }
            if event == PlayerEvent::Closed {
                break;
            }
        }
        drop(surface);

        match last_saved {
            Some(seconds) => println!("Saved progress: {}", format_position(seconds)),
            None => println!("No playback progress recorded."),
        }
        Ok(())
    })
}

fn run_logout(ctx: &AppContext) -> Result<()> {
    ctx.api.tokens().clear()?;
    println!("Stored token cleared.");
    Ok(())
}
