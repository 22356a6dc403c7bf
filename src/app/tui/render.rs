use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, Padding, Paragraph, Row, Table, Wrap,
};

use super::super::course_detail::DetailState;
use super::super::course_list::CourseListState;
use super::super::format::{build_progress_gauge, format_rating, format_saved, truncate};
use super::{CatalogScreen, CourseScreen, Screen};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_tui(frame: &mut Frame, screen: &mut Screen, status: &str) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let path = screen.route().path();
    match screen {
        Screen::Catalog(catalog) => draw_catalog(frame, catalog, &path, &chunks),
        Screen::Course(course) => draw_course(frame, course, &path, &chunks),
    }

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);
}

fn header_line(path: &str, details: Vec<String>) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            "LESSONVIEW",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(path.to_string(), Style::default().fg(Color::Yellow)),
    ];
    for detail in details {
        spans.push(Span::styled("   ", Style::default()));
        spans.push(Span::styled(detail, Style::default().fg(MUTED)));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Lessonview"))
}

fn draw_catalog(frame: &mut Frame, catalog: &mut CatalogScreen, path: &str, chunks: &[Rect]) {
    let view = &catalog.view;
    let header = header_line(
        path,
        vec![
            format!("{} courses", view.courses().len()),
            format!("page {}/{}", view.page(), view.page_count().max(1)),
        ],
    );
    frame.render_widget(header, chunks[0]);

    match view.state() {
        CourseListState::Loading => {
            render_placeholder(frame, chunks[1], "Courses", "Loading courses...");
        }
        CourseListState::Failed(message) => {
            let text = format!("Could not load courses.\n\n{message}\n\nPress r to retry.");
            render_placeholder(frame, chunks[1], "Courses", &text);
        }
        CourseListState::Loaded(courses) if courses.is_empty() => {
            render_placeholder(frame, chunks[1], "Courses", "No courses available.");
        }
        CourseListState::Loaded(_) => {
            let rows: Vec<Row> = view
                .page_items()
                .iter()
                .map(|course| {
                    Row::new(vec![
                        Cell::from(truncate(&course.title, 60)),
                        Cell::from(course.lessons_count.to_string()),
                        Cell::from(course.skills_count().to_string()),
                        Cell::from(format_rating(course.rating)),
                    ])
                })
                .collect();
            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(64),
                    Constraint::Length(9),
                    Constraint::Length(8),
                    Constraint::Length(8),
                ],
            )
            .header(table_header(vec!["Title", "Lessons", "Skills", "Rating"]))
            .block(panel_block("Courses"))
            .row_highlight_style(highlight_style())
            .highlight_symbol("▸ ");
            frame.render_stateful_widget(table, chunks[1], &mut catalog.table_state);
        }
    }

    let controls = Paragraph::new(pagination_line(view.page(), view.page_count()))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);
}

fn draw_course(frame: &mut Frame, course: &mut CourseScreen, path: &str, chunks: &[Rect]) {
    let title = course
        .view
        .detail()
        .map(|detail| truncate(&detail.course.title, 48))
        .unwrap_or_else(|| "...".to_string());
    let mut details = vec![title];
    if let Some(handle) = course.player.as_ref() {
        details.push(format!("{:.1}x", handle.surface.playback_rate()));
        if handle.surface.pip_active() {
            details.push("PiP".to_string());
        }
    }
    frame.render_widget(header_line(path, details), chunks[0]);

    let placeholder = match course.view.state() {
        DetailState::Loading => Some("Loading course...".to_string()),
        DetailState::Failed(message) => Some(format!(
            "Could not load this course.\n\n{message}\n\nPress r to retry or Esc to go back."
        )),
        DetailState::Ready(_) => None,
    };
    match placeholder {
        Some(text) => render_placeholder(frame, chunks[1], "Lessons", &text),
        None => draw_lessons(frame, course, chunks[1]),
    }

    let player = course.player.as_ref().map(|handle| PlayerStatus {
        rate: handle.surface.playback_rate(),
        pip: handle.surface.pip_active(),
    });
    let mut spans = Vec::new();
    for (label, active) in control_pills(player) {
        let style = if active {
            pill_active()
        } else {
            pill_inactive()
        };
        spans.push(Span::styled(format!(" {label} "), style));
        spans.push(Span::styled(" ", Style::default()));
    }
    spans.push(Span::styled(
        "  j/k move  Enter play  ↑/↓ rate  p pip  Space pause  0 restart  Esc back  q quit",
        Style::default().fg(MUTED),
    ));
    let controls = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);
}

fn draw_lessons(frame: &mut Frame, course: &mut CourseScreen, area: Rect) {
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body[1]);

    let lessons = course.view.lessons();
    let active = course.view.active_index();
    if lessons.is_empty() {
        render_placeholder(frame, body[0], "Lessons", "This course has no lessons.");
    } else {
        let rows: Vec<Row> = lessons
            .iter()
            .enumerate()
            .map(|(idx, lesson)| {
                let marker = if Some(idx) == active {
                    "▶"
                } else if lesson.is_unlocked() {
                    " "
                } else {
                    "🔒"
                };
                let row = Row::new(vec![
                    Cell::from(marker),
                    Cell::from(lesson.order.to_string()),
                    Cell::from(truncate(&lesson.title, 48)),
                    Cell::from(format_saved(course.saved_positions.get(&lesson.id).copied())),
                ]);
                if lesson.is_unlocked() {
                    row
                } else {
                    row.style(Style::default().fg(Color::Rgb(120, 125, 135)))
                }
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(2),
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(9),
            ],
        )
        .header(table_header(vec!["", "#", "Lesson", "Saved"]))
        .block(panel_block("Lessons"))
        .row_highlight_style(highlight_style())
        .highlight_symbol("▸ ");
        frame.render_stateful_widget(table, body[0], &mut course.table_state);
    }

    let selected = course
        .table_state
        .selected()
        .and_then(|idx| course.view.lessons().get(idx));
    let (selection_text, gauge) = match selected {
        Some(lesson) => {
            let saved = course.saved_positions.get(&lesson.id).copied();
            let gauge = lesson
                .duration
                .and_then(|duration| build_progress_gauge(saved.unwrap_or(0.0), duration));
            let status = if lesson.is_unlocked() { "Open" } else { "Locked" };
            let text = format!(
                "Lesson\n{}\n\nStatus\n{status}\n\nSaved\n{}\n\nLength\n{}\n\nPreview\n{}",
                truncate(&lesson.title, 40),
                format_saved(saved),
                format_saved(lesson.duration),
                truncate(&lesson.preview_url(), 40),
            );
            (text, gauge)
        }
        None => {
            let text = course
                .view
                .detail()
                .map(|detail| {
                    format!(
                        "Course\n{}\n\nSkills\n{}\n\nCover\n{}",
                        truncate(&detail.course.title, 40),
                        detail.course.skills_count(),
                        truncate(&detail.course.cover_url(), 40),
                    )
                })
                .unwrap_or_default();
            (text, None)
        }
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .wrap(Wrap { trim: false })
        .block(panel_block("Selected"));
    frame.render_widget(selection, side[0]);
    if let Some((ratio, label)) = gauge {
        let progress = Gauge::default()
            .block(panel_block("Progress"))
            .gauge_style(
                Style::default()
                    .fg(Color::Rgb(130, 190, 255))
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(label)
            .ratio(ratio);
        frame.render_widget(progress, side[1]);
    }

    if let Some(lesson) = selected
        && !lesson.is_unlocked()
    {
        let popup_text = format!(
            "{}\n\nThis lesson is locked.\n\nPick an open lesson to keep watching.",
            truncate(&lesson.title, 56)
        );
        let popup_area = popup_rect_for_text(frame.area(), &popup_text);
        render_popup_shadow(frame, popup_area);
        frame.render_widget(Clear, popup_area);
        let popup = Paragraph::new(popup_text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(modal_block("Locked"));
        frame.render_widget(popup, popup_area);
    }
}

fn render_placeholder(frame: &mut Frame, area: Rect, title: &'static str, text: &str) {
    let widget = Paragraph::new(text.to_string())
        .style(Style::default().fg(MUTED))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel_block(title));
    frame.render_widget(widget, area);
}

fn table_header(labels: Vec<&'static str>) -> Row<'static> {
    Row::new(labels).style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

#[derive(Debug, Clone, Copy)]
struct PlayerStatus {
    rate: f64,
    pip: bool,
}

/// Player window, speed and picture-in-picture pills, lit while they are
/// in effect.
fn control_pills(player: Option<PlayerStatus>) -> [(String, bool); 3] {
    match player {
        Some(status) => [
            ("PLAYER".to_string(), true),
            (format!("{:.2}x", status.rate), (status.rate - 1.0).abs() > f64::EPSILON),
            ("PIP".to_string(), status.pip),
        ],
        None => [
            ("PLAYER".to_string(), false),
            ("1.00x".to_string(), false),
            ("PIP".to_string(), false),
        ],
    }
}

fn pill_active() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn pill_inactive() -> Style {
    Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242))
}

/// `‹ 1 2 [3] 4 ›` style page selector.
fn pagination_line(page: usize, page_count: usize) -> Line<'static> {
    let mut spans = vec![Span::styled(
        if page > 1 { " ‹ " } else { "   " },
        Style::default().fg(MUTED),
    )];
    for number in 1..=page_count.max(1) {
        let style = if number == page {
            pill_active()
        } else {
            pill_inactive()
        };
        spans.push(Span::styled(format!(" {number} "), style));
        spans.push(Span::styled(" ", Style::default()));
    }
    spans.push(Span::styled(
        if page < page_count { "› " } else { "  " },
        Style::default().fg(MUTED),
    ));
    spans.push(Span::styled(
        "  ↑/↓ move  ←/→ page  Enter open  r reload  q quit",
        Style::default().fg(MUTED),
    ));
    Line::from(spans)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let widest = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let width = widest
        .saturating_add(12)
        .clamp(40.min(available_width), 72.min(available_width));

    let available_height = area.height.saturating_sub(2).max(1);
    let height = line_count
        .saturating_add(6)
        .clamp(8.min(available_height), 16.min(available_height));

    centered_fixed_rect(width, height, area)
}
