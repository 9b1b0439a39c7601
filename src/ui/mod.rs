pub mod table;

use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ClearTarget, Popup};
use crate::theme::Theme;

// Load theme colors once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

/// Screen regions, shared by rendering and mouse hit-testing.
pub struct Chunks {
    pub info: Rect,
    pub jobs: Rect,
    pub footer: Rect,
}

pub fn layout(area: Rect) -> Chunks {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(5),    // Jobs table
            Constraint::Length(1), // Footer
        ])
        .split(area);

    Chunks {
        info: chunks[0],
        jobs: chunks[1],
        footer: chunks[2],
    }
}

/// Body rows that fit in the jobs area: the borders, the header row and
/// the reserved overflow line are not available for jobs.
pub fn table_capacity(jobs_area: Rect) -> usize {
    jobs_area.height.saturating_sub(4) as usize
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = layout(f.area());

    draw_info_line(f, app, chunks.info);
    draw_jobs(f, app, chunks.jobs);
    draw_footer(f, chunks.footer);

    match app.popup {
        Popup::None => {}
        Popup::Help => draw_help_popup(f),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status/action feedback > standing summary
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(warning())))
    } else {
        let summary = format!(
            "{} of {} jobs │ {} filter(s) │ {}",
            app.number_format.format(app.filtered.len() as u64),
            app.number_format.format(app.jobs.len() as u64),
            app.filters.active_count(),
            app.snapshot_path.display(),
        );
        Line::from(Span::styled(summary, Style::default().fg(text_dim())))
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_jobs(f: &mut Frame, app: &App, area: Rect) {
    if app.jobs.is_empty() {
        let block = Block::default()
            .title(Span::styled(" Jobs ", Style::default().fg(inactive())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(inactive()));
        let empty = Paragraph::new("No jobs in snapshot. Press 'R' to reload.")
            .style(Style::default().fg(text_dim()))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    // With filters matching nothing the table still renders its header,
    // keeping the clear affordances reachable.

    let capacity = table_capacity(area);
    let (start, end) = app.window(capacity);
    let jobs = &app.filtered[start..end];

    // Rendering never fires callbacks; the sink only determines which
    // header cells carry the clear affordance.
    let sink = |_: ClearTarget| {};
    let table = app.status_table(jobs, &sink);

    let selected = app
        .selected
        .checked_sub(start)
        .filter(|i| *i < jobs.len());
    table.render(f, area, selected);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let hints: Vec<(&str, &str)> = vec![
        ("↑↓", "Nav"),
        ("I/Q/S/T", "Filter"),
        ("1-9", "Col"),
        ("u", "Unfilter"),
        ("s", "Status"),
        ("R", "Reload"),
        ("h", "Help"),
        ("q", "Quit"),
    ];

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 {
        4
    } else if area.width < 90 {
        6
    } else {
        hints.len()
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 75 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Navigation ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", Style::default().fg(accent())),
            Span::raw("Move through the job list"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Filters ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  I         ", Style::default().fg(accent())),
            Span::raw("Filter to the selected job's ID"),
        ]),
        Line::from(vec![
            Span::styled("  Q         ", Style::default().fg(accent())),
            Span::raw("Filter to the selected job's queue"),
        ]),
        Line::from(vec![
            Span::styled("  S         ", Style::default().fg(accent())),
            Span::raw("Filter to the selected job's job set"),
        ]),
        Line::from(vec![
            Span::styled("  T         ", Style::default().fg(accent())),
            Span::raw("Filter to the selected job's status"),
        ]),
        Line::from(vec![
            Span::styled("  1-9       ", Style::default().fg(accent())),
            Span::raw("Filter additional column n to the selected job's value"),
        ]),
        Line::from(vec![
            Span::styled("  u         ", Style::default().fg(accent())),
            Span::raw("Clear all filters"),
        ]),
        Line::from(vec![
            Span::raw("            Clicking a "),
            Span::styled("✕", Style::default().fg(accent())),
            Span::raw(" in the table header clears that filter"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ View ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  s         ", Style::default().fg(accent())),
            Span::raw("Toggle the Status column"),
        ]),
        Line::from(vec![
            Span::styled("  R         ", Style::default().fg(accent())),
            Span::raw("Reload the jobs snapshot now"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ General ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  h/?       ", Style::default().fg(accent())),
            Span::raw("Show this help"),
        ]),
        Line::from(vec![
            Span::styled("  q         ", Style::default().fg(danger())),
            Span::raw("Quit"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" jobwatch Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
