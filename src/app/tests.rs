use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use crate::models::{Course, CourseDetail};
use crate::player::{LoadTicket, MediaSurface, PlayerEvent, RateLimits, UNTRACKED_LOAD};
use crate::store::{KeyValueStore, MemoryStore, ProgressStore};

use super::Route;
use super::course_detail::{CourseDetailView, DetailState, PipOutcome, RateKey, Selection};
use super::course_list::{CourseListState, CourseListView};
use super::format::{build_progress_gauge, format_position, format_saved, truncate};

#[derive(Debug, Default)]
struct FakeSurface {
    loads: Vec<(String, Option<f64>)>,
    fail_loads: bool,
    rate: f64,
    pip_supported: bool,
    pip_active: bool,
}

impl FakeSurface {
    fn new() -> Self {
        Self {
            rate: 1.0,
            pip_supported: true,
            ..Self::default()
        }
    }
}

impl MediaSurface for FakeSurface {
    fn load(&mut self, source: &str, start_at: Option<f64>) -> Result<LoadTicket> {
        if self.fail_loads {
            anyhow::bail!("player went away");
        }
        self.loads.push((source.to_string(), start_at));
        Ok(self.loads.len() as LoadTicket)
    }

    fn set_current_time(&mut self, _seconds: f64) -> Result<()> {
        Ok(())
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.rate = rate;
        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn pip_supported(&self) -> bool {
        self.pip_supported
    }

    fn pip_active(&self) -> bool {
        self.pip_active
    }

    fn request_pip(&mut self) -> Result<()> {
        self.pip_active = true;
        Ok(())
    }

    fn exit_pip(&mut self) -> Result<()> {
        self.pip_active = false;
        Ok(())
    }
}

fn limits() -> RateLimits {
    RateLimits { min: 0.25, max: 4.0 }
}

fn progress_store() -> (Arc<MemoryStore>, ProgressStore) {
    let backend = Arc::new(MemoryStore::new());
    let progress = ProgressStore::new(backend.clone());
    (backend, progress)
}

fn course_detail(id: &str, lessons: &[(&str, &str)]) -> CourseDetail {
    let lessons: Vec<_> = lessons
        .iter()
        .enumerate()
        .map(|(idx, (lesson_id, status))| {
            json!({
                "id": lesson_id,
                "title": format!("Lesson {lesson_id}"),
                "order": idx + 1,
                "link": format!("https://cdn.example.test/{id}/{lesson_id}.m3u8"),
                "previewImageLink": "https://cdn.example.test/previews",
                "status": status,
                "duration": 600,
            })
        })
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "title": format!("Course {id}"),
        "lessonsCount": lessons.len(),
        "rating": 4.5,
        "lessons": lessons,
    }))
    .expect("valid course detail")
}

fn courses(count: usize) -> Vec<Course> {
    (0..count)
        .map(|idx| {
            serde_json::from_value(json!({
                "id": format!("course-{idx}"),
                "title": format!("Course {idx}"),
            }))
            .expect("valid course")
        })
        .collect()
}

fn loaded_view(lessons: &[(&str, &str)]) -> CourseDetailView {
    let mut view = CourseDetailView::new("7", limits());
    view.apply_loaded(course_detail("7", lessons));
    view
}

#[test]
fn first_lesson_is_active_even_when_locked() {
    let view = loaded_view(&[("1", "locked"), ("2", "unlocked")]);
    assert_eq!(view.active_index(), Some(0));
    assert_eq!(view.active_lesson().map(|l| l.id.as_str()), Some("1"));
}

#[test]
fn repeated_detail_fetches_activate_the_same_first_lesson() {
    let lessons = [("1", "unlocked"), ("2", "unlocked")];
    let mut view = loaded_view(&lessons);
    let first = view.active_lesson().cloned();
    view.apply_loaded(course_detail("7", &lessons));
    assert_eq!(view.active_index(), Some(0));
    assert_eq!(view.active_lesson().cloned(), first);
}

#[test]
fn course_without_lessons_has_no_active_lesson() {
    let mut view = loaded_view(&[]);
    assert!(matches!(view.state(), DetailState::Ready(_)));
    assert!(view.active_lesson().is_none());

    let (_, progress) = progress_store();
    let mut surface = FakeSurface::new();
    assert!(
        view.start_active_playback(&mut surface, &progress)
            .is_err()
    );
    assert!(surface.loads.is_empty());
}

#[test]
fn selecting_the_active_lesson_again_is_a_no_op() {
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked")]);
    assert_eq!(view.select_lesson(1), Selection::Activated);
    assert_eq!(view.select_lesson(1), Selection::AlreadyActive);
    assert_eq!(view.active_index(), Some(1));
}

#[test]
fn locked_lesson_never_becomes_active() {
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "locked")]);
    assert_eq!(view.select_lesson(1), Selection::Locked);
    assert_eq!(view.active_index(), Some(0));
    assert_eq!(view.select_lesson(9), Selection::Missing);
    assert_eq!(view.active_index(), Some(0));
}

#[test]
fn playback_resumes_from_saved_position() {
    let (_, progress) = progress_store();
    progress.save("7", "3", 42.5).expect("save");

    let mut view = loaded_view(&[("1", "unlocked"), ("3", "unlocked")]);
    view.select_lesson(1);
    let mut surface = FakeSurface::new();
    let resume_at = view
        .start_active_playback(&mut surface, &progress)
        .expect("playback starts");

    assert_eq!(resume_at, Some(42.5));
    assert_eq!(
        surface.loads,
        vec![(
            "https://cdn.example.test/7/3.m3u8".to_string(),
            Some(42.5)
        )]
    );
}

#[test]
fn zero_or_missing_progress_starts_from_the_beginning() {
    let (_, progress) = progress_store();
    progress.save("7", "1", 0.0).expect("save");

    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked")]);
    let mut surface = FakeSurface::new();
    assert_eq!(
        view.start_active_playback(&mut surface, &progress)
            .expect("lesson 1"),
        None
    );
    view.select_lesson(1);
    assert_eq!(
        view.start_active_playback(&mut surface, &progress)
            .expect("lesson 2"),
        None
    );
    assert!(surface.loads.iter().all(|(_, start)| start.is_none()));
}

#[test]
fn lesson_without_link_fails_to_play() {
    let mut detail = course_detail("7", &[("1", "unlocked")]);
    detail.lessons[0].link = String::new();
    let mut view = CourseDetailView::new("7", limits());
    view.apply_loaded(detail);

    let (_, progress) = progress_store();
    let mut surface = FakeSurface::new();
    assert!(
        view.start_active_playback(&mut surface, &progress)
            .is_err()
    );
    assert!(surface.loads.is_empty());
}

#[test]
fn time_updates_are_saved_only_after_the_player_switches() {
    let (backend, progress) = progress_store();
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked")]);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("playback starts");

    assert_eq!(
        view.handle_player_event(PlayerEvent::TimeUpdate(300.0), &progress),
        None
    );
    assert_eq!(backend.get("course-7-lesson-1").expect("get"), None);

    assert_eq!(
        view.handle_player_event(PlayerEvent::Started(1), &progress),
        None
    );
    let saved = view
        .handle_player_event(PlayerEvent::TimeUpdate(12.25), &progress)
        .expect("position saved");
    assert_eq!(saved.lesson_id, "1");
    assert_eq!(saved.seconds, 12.25);
    assert_eq!(progress.load("7", "1").expect("load"), Some(12.25));
}

#[test]
fn positions_before_the_switch_stay_with_the_previous_lesson() {
    let (_, progress) = progress_store();
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked")]);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 1");
    view.handle_player_event(PlayerEvent::Started(1), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(80.0), &progress);

    view.select_lesson(1);
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 2");
    // Tail of lesson 1 flushed as the player pauses for the switch.
    let saved = view
        .handle_player_event(PlayerEvent::TimeUpdate(80.2), &progress)
        .expect("tail saved");
    assert_eq!(saved.lesson_id, "1");
    assert_eq!(progress.load("7", "1").expect("load"), Some(80.2));
    assert_eq!(progress.load("7", "2").expect("load"), None);

    view.handle_player_event(PlayerEvent::Started(2), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(3.0), &progress);
    assert_eq!(progress.load("7", "1").expect("load"), Some(80.2));
    assert_eq!(progress.load("7", "2").expect("load"), Some(3.0));
}

#[test]
fn failed_switch_keeps_saving_under_the_playing_lesson() {
    let (_, progress) = progress_store();
    let mut detail = course_detail("7", &[("1", "unlocked"), ("2", "unlocked")]);
    detail.lessons[1].link = String::new();
    let mut view = CourseDetailView::new("7", limits());
    view.apply_loaded(detail);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 1");
    view.handle_player_event(PlayerEvent::Started(1), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(80.0), &progress);

    assert_eq!(view.select_lesson(1), Selection::Activated);
    assert!(
        view.start_active_playback(&mut surface, &progress)
            .is_err()
    );
    assert_eq!(view.active_index(), Some(0));

    view.handle_player_event(PlayerEvent::TimeUpdate(81.0), &progress);
    assert_eq!(progress.load("7", "1").expect("load"), Some(81.0));
    assert_eq!(progress.load("7", "2").expect("load"), None);
}

#[test]
fn surface_error_on_switch_restores_selection() {
    let (_, progress) = progress_store();
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked")]);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 1");
    view.handle_player_event(PlayerEvent::Started(1), &progress);

    surface.fail_loads = true;
    view.select_lesson(1);
    assert!(
        view.start_active_playback(&mut surface, &progress)
            .is_err()
    );
    assert_eq!(view.active_index(), Some(0));

    view.handle_player_event(PlayerEvent::TimeUpdate(40.0), &progress);
    assert_eq!(progress.load("7", "1").expect("load"), Some(40.0));
    assert_eq!(progress.load("7", "2").expect("load"), None);
}

#[test]
fn rapid_switches_attribute_positions_to_the_reported_file() {
    let (_, progress) = progress_store();
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked"), ("3", "unlocked")]);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 1");
    view.handle_player_event(PlayerEvent::Started(1), &progress);
    view.select_lesson(1);
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 2");
    view.select_lesson(2);
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 3");

    // The player reaches lesson 2 before the lesson 3 request.
    view.handle_player_event(PlayerEvent::Started(2), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(5.0), &progress);
    assert_eq!(progress.load("7", "2").expect("load"), Some(5.0));
    assert_eq!(progress.load("7", "3").expect("load"), None);

    view.handle_player_event(PlayerEvent::Started(3), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(7.0), &progress);
    assert_eq!(progress.load("7", "2").expect("load"), Some(5.0));
    assert_eq!(progress.load("7", "3").expect("load"), Some(7.0));
}

#[test]
fn skipped_and_foreign_files_are_not_recorded() {
    let (_, progress) = progress_store();
    let mut view = loaded_view(&[("1", "unlocked"), ("2", "unlocked"), ("3", "unlocked")]);
    let mut surface = FakeSurface::new();
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 1");
    view.select_lesson(1);
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 2");
    view.select_lesson(2);
    view.start_active_playback(&mut surface, &progress)
        .expect("lesson 3");

    // Lessons 1 and 2 were replaced before they ever started.
    view.handle_player_event(PlayerEvent::Started(3), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(9.0), &progress);
    assert_eq!(progress.load("7", "3").expect("load"), Some(9.0));

    // A late report for a replaced load no longer maps to any lesson.
    view.handle_player_event(PlayerEvent::Started(2), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(11.0), &progress);
    view.handle_player_event(PlayerEvent::Started(UNTRACKED_LOAD), &progress);
    view.handle_player_event(PlayerEvent::TimeUpdate(12.0), &progress);
    assert_eq!(progress.load("7", "1").expect("load"), None);
    assert_eq!(progress.load("7", "2").expect("load"), None);
    assert_eq!(progress.load("7", "3").expect("load"), Some(9.0));
}

#[test]
fn rate_steps_by_a_tenth_and_clamps() {
    let view = loaded_view(&[("1", "unlocked")]);
    let mut surface = FakeSurface::new();

    assert_eq!(view.adjust_rate(&mut surface, RateKey::Up).expect("up"), 1.1);
    assert_eq!(
        view.adjust_rate(&mut surface, RateKey::Down).expect("down"),
        1.0
    );

    surface.rate = 3.95;
    assert_eq!(view.adjust_rate(&mut surface, RateKey::Up).expect("up"), 4.0);
    assert_eq!(view.adjust_rate(&mut surface, RateKey::Up).expect("up"), 4.0);

    surface.rate = 0.3;
    assert_eq!(
        view.adjust_rate(&mut surface, RateKey::Down).expect("down"),
        0.25
    );
    assert_eq!(surface.rate, 0.25);
}

#[test]
fn pip_toggles_and_reports_unsupported() {
    let view = loaded_view(&[("1", "unlocked")]);
    let mut surface = FakeSurface::new();
    assert_eq!(
        view.toggle_pip(&mut surface).expect("enter"),
        PipOutcome::Entered
    );
    assert!(surface.pip_active);
    assert_eq!(
        view.toggle_pip(&mut surface).expect("exit"),
        PipOutcome::Exited
    );
    assert!(!surface.pip_active);

    surface.pip_supported = false;
    assert_eq!(
        view.toggle_pip(&mut surface).expect("unsupported"),
        PipOutcome::Unsupported
    );
    assert!(!surface.pip_active);
}

#[test]
fn failed_detail_load_clears_active_lesson() {
    let mut view = CourseDetailView::new("7", limits());
    view.apply_failed("HTTP 500".to_string());
    assert_eq!(view.state(), &DetailState::Failed("HTTP 500".to_string()));
    assert!(view.lessons().is_empty());
    assert!(view.active_lesson().is_none());
}

#[test]
fn course_list_pages_twenty_five_courses_by_ten() {
    let mut view = CourseListView::new(10);
    assert_eq!(view.state(), &CourseListState::Loading);
    view.apply_loaded(courses(25));

    assert_eq!(view.page_count(), 3);
    assert_eq!(view.page_items().len(), 10);
    assert_eq!(view.page_items()[0].id, "course-0");

    assert!(view.set_page(3));
    assert_eq!(view.page_items().len(), 5);
    assert_eq!(view.page_items()[0].id, "course-20");

    assert!(!view.next_page());
    assert_eq!(view.page(), 3);
    assert!(view.prev_page());
    assert_eq!(view.page(), 2);
}

#[test]
fn course_list_clamps_out_of_range_pages() {
    let mut view = CourseListView::new(10);
    view.apply_loaded(courses(25));
    view.set_page(99);
    assert_eq!(view.page(), 3);
    view.set_page(0);
    assert_eq!(view.page(), 1);

    let mut empty = CourseListView::new(10);
    empty.apply_loaded(Vec::new());
    assert!(!empty.set_page(4));
    assert_eq!(empty.page(), 1);
    assert!(empty.page_items().is_empty());
}

#[test]
fn course_list_reload_keeps_page() {
    let mut view = CourseListView::new(10);
    view.apply_loaded(courses(25));
    view.set_page(2);
    view.apply_loaded(courses(25));
    assert_eq!(view.page(), 2);
    assert_eq!(view.page_items()[0].id, "course-10");
}

#[test]
fn course_list_routes_to_course_on_current_page() {
    let mut view = CourseListView::new(10);
    view.apply_loaded(courses(25));
    view.set_page(2);
    assert_eq!(
        view.route_for(3),
        Some(Route::Course("course-13".to_string()))
    );
    assert_eq!(view.route_for(10), None);
    assert_eq!(
        view.route_for(0).map(|route| route.path()),
        Some("/course/course-10".to_string())
    );
    assert_eq!(Route::Catalog.path(), "/");
}

#[test]
fn format_helpers_render_positions() {
    assert_eq!(format_position(0.0), "0:00");
    assert_eq!(format_position(42.5), "0:42");
    assert_eq!(format_position(3725.0), "1:02:05");
    assert_eq!(format_position(f64::NAN), "0:00");
    assert_eq!(format_saved(None), "-");
    assert_eq!(format_saved(Some(61.0)), "1:01");
    assert_eq!(truncate("abcdefgh", 6), "abc...");
    assert_eq!(truncate("abc", 6), "abc");
}

#[test]
fn progress_gauge_clamps_and_skips_unknown_duration() {
    assert_eq!(
        build_progress_gauge(150.0, 600.0),
        Some((0.25, "2:30 / 10:00".to_string()))
    );
    assert_eq!(
        build_progress_gauge(900.0, 600.0).map(|(ratio, _)| ratio),
        Some(1.0)
    );
    assert_eq!(build_progress_gauge(10.0, 0.0), None);
}
