use crate::api::{FileUploader, RemoteTasks};
use crate::app::{App, InputMode, StatusKind};
use crate::session::{EditTarget, Field};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SUMMARY_COLUMN: usize = 40;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((r.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn key_hint(key: &'static str, label: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(label),
    ]
}

fn get_legend(editing: bool, input_mode: &InputMode) -> Text<'static> {
    let hints: Vec<(&'static str, &'static str)> = match input_mode {
        _ if editing => vec![
            (" Tab ", ": Switch Field "),
            (" Enter ", ": Save "),
            (" Esc ", ": Cancel "),
        ],
        InputMode::Normal => vec![
            (" q ", ": Quit "),
            (" j ", ": Down "),
            (" k ", ": Up "),
            (" a ", ": New "),
            (" e ", ": Edit "),
            (" f ", ": Mark Complete "),
            (" d ", ": Delete "),
            (" r ", ": Reload "),
            (" t ", ": Toggle Finished "),
            (" u ", ": Upload File "),
        ],
        InputMode::ConfirmDelete(_) => vec![(" y ", ": Confirm Delete "), (" any ", ": Keep ")],
        InputMode::Upload => vec![(" Enter ", ": Upload "), (" Esc ", ": Cancel ")],
    };
    let spans: Vec<Span<'static>> = hints
        .into_iter()
        .flat_map(|(key, label)| key_hint(key, label))
        .collect();
    Text::from(Line::from(spans))
}

// Fit to exactly `width` terminal cells; wide glyphs count as two.
fn pad(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

fn render_list<R>(f: &mut Frame, app: &mut App<R>, area: Rect) {
    let mut title = if app.store.filter().is_finished == Some(false) {
        "Tasks (Unfinished)".to_string()
    } else {
        "Tasks (All)".to_string()
    };
    if app.store.is_stale() {
        title.push_str(" (stale)");
    }

    let tasks_widget = if !app.store.is_empty() {
        let tasks: Vec<ListItem> = app
            .store
            .records()
            .iter()
            .map(|task| {
                let actions = task.actions();
                let marker = if actions.finished_label {
                    Span::styled("DONE ", Style::default().fg(Color::Green))
                } else {
                    Span::styled("TODO ", Style::default().fg(Color::Yellow))
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::raw(pad(&task.summary, SUMMARY_COLUMN)),
                    Span::raw("  "),
                    Span::styled(task.created_label(), Style::default().fg(Color::DarkGray)),
                    Span::raw("  "),
                    Span::raw(task.details_preview()),
                ]))
            })
            .collect();

        List::new(tasks)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    } else {
        List::new(vec![ListItem::new("No tasks available")])
            .block(Block::default().borders(Borders::ALL).title(title))
    };

    f.render_stateful_widget(tasks_widget, area, &mut app.state);
}

fn field_block(label: &'static str, active: bool) -> Block<'static> {
    let style = if active {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default().title(label).borders(Borders::ALL).style(style)
}

fn error_line(message: Option<&str>) -> Paragraph<'static> {
    Paragraph::new(message.unwrap_or("").to_string()).style(Style::default().fg(Color::Red))
}

fn render_modal<R>(f: &mut Frame, app: &App<R>, area: Rect) {
    let session = &app.session;
    let popup_width = percent_of(area.width, 60).max(30).min(area.width);
    let inner_width = popup_width.saturating_sub(4);
    let details_lines =
        calculate_wrapped_lines(&session.details_draft, inner_width).clamp(1, 6) as u16;
    // borders + summary(3) + error(1) + details + error(1) + remote(1)
    let popup_height = (2 + 3 + 1 + details_lines + 2 + 1 + 1).min(area.height);
    let popup_area = centered_rect_absolute(popup_width, popup_height, area);

    let title = match session.target() {
        EditTarget::Existing(id) => format!("Edit Task #{}", id),
        EditTarget::New => "New Task".to_string(),
    };
    let title = if session.is_in_flight() {
        format!("{} (saving...)", title)
    } else {
        title
    };
    let outer = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));
    let inner = outer.inner(popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(details_lines + 2),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let active = session.active_field();
    let summary = Paragraph::new(session.summary_draft.as_str())
        .style(Style::default().fg(Color::White))
        .block(field_block("Summary", active == Field::Summary));
    let details = Paragraph::new(session.details_draft.as_str())
        .style(Style::default().fg(Color::White))
        .block(field_block("Details", active == Field::Details))
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(outer, popup_area);
    f.render_widget(summary, rows[0]);
    f.render_widget(error_line(session.errors().get(Field::Summary)), rows[1]);
    f.render_widget(details, rows[2]);
    f.render_widget(error_line(session.errors().get(Field::Details)), rows[3]);
    f.render_widget(
        error_line(session.remote_error()).wrap(Wrap { trim: true }),
        rows[4],
    );
}

fn render_prompt(f: &mut Frame, title: &'static str, value: &str, area: Rect) {
    let popup_width = percent_of(area.width, 60).max(20).min(area.width);
    let popup_area = centered_rect_absolute(popup_width, 3, area);
    let input = Paragraph::new(value.to_string())
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Green)),
        );
    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

fn render_status<R>(f: &mut Frame, app: &App<R>, area: Rect) {
    let line = match (&app.input_mode, &app.status) {
        (InputMode::ConfirmDelete(id), _) => {
            Line::from(Span::styled(
                format!("Delete task #{}? (y/n)", id),
                Style::default().fg(Color::Yellow),
            ))
        }
        (_, Some(status)) => {
            let color = match status.kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
        }
        (_, None) => Line::from(""),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw<R>(f: &mut Frame, app: &mut App<R>) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(size);

    let body_chunk = chunks[0];
    render_list(f, app, body_chunk);

    if app.session.is_open() {
        render_modal(f, app, body_chunk);
    } else if app.input_mode == InputMode::Upload {
        render_prompt(
            f,
            "Upload File (Enter to Send)",
            &app.upload_path,
            body_chunk,
        );
    }

    render_status(f, app, chunks[1]);

    let legend = Paragraph::new(get_legend(app.session.is_open(), &app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[2]);
}

pub async fn run_app<B, R>(terminal: &mut Terminal<B>, mut app: App<R>) -> io::Result<()>
where
    B: Backend,
    R: RemoteTasks + FileUploader,
{
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_input(key).await? {
                    return Ok(());
                }
            }
        }
    }
}

fn percent_of(width: u16, percent: u32) -> u16 {
    (u32::from(width) * percent / 100) as u16
}

fn calculate_wrapped_lines(text: &str, max_width: u16) -> usize {
    if max_width == 0 {
        return 0;
    }
    let max_width = max_width as usize;
    text.lines()
        .map(|line| line.width().div_ceil(max_width).max(1))
        .sum()
}
