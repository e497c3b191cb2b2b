//! UI rendering using ratatui
//!
//! One screen: header (turn prompt, timer), input and feedback, the
//! activity feed on the right, and the session summary once it is over.

use crate::app::{App, FeedEntry};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
};
use termrace::{Challenge, SessionSummary, Turn};

/// Render the game screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with prompt, timer
            Constraint::Min(0),    // Main content area
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    let snapshot = app.snapshot();
    render_header(frame, layout[0], app, snapshot.state.turn.as_ref());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(30),    // Main area
            Constraint::Length(26), // Feed
        ])
        .split(layout[1]);

    if let Some(message) = &app.fatal {
        render_fatal(frame, columns[0], message);
    } else if app.is_session_over() {
        render_end_summary(frame, columns[0], &app.summary());
    } else {
        render_input_area(frame, columns[0], app);
    }
    render_feed(frame, columns[1], app);

    let hints = if app.is_session_over() {
        "Esc Quit"
    } else {
        "Enter Submit  Tab Pass  Esc Quit"
    };
    let footer = Paragraph::new(hints)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[2]);
}

/// Render the header: logo, turn prompt, timer
fn render_header(frame: &mut Frame, area: Rect, app: &App, turn: Option<&Turn>) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12), // Logo
            Constraint::Min(20),    // Prompt
            Constraint::Length(10), // Timer
        ])
        .split(inner);

    let logo = Paragraph::new("TERMRACE")
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Left);
    frame.render_widget(logo, header_layout[0]);

    let prompt = Paragraph::new(format_prompt(turn))
        .style(Style::default().fg(prompt_color(turn)).bold())
        .alignment(Alignment::Center);
    frame.render_widget(prompt, header_layout[1]);

    let timer_color = if app.time_remaining <= 10 {
        Color::Red
    } else if app.time_remaining <= 30 {
        Color::Yellow
    } else {
        Color::Green
    };
    let timer = Paragraph::new(format_timer(app.time_remaining))
        .style(Style::default().fg(timer_color).bold())
        .alignment(Alignment::Right);
    frame.render_widget(timer, header_layout[2]);
}

/// Render the input/feedback area
fn render_input_area(frame: &mut Frame, area: Rect, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Input line
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Feedback line
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Score and combo
            Constraint::Min(0),    // Remaining space
        ])
        .split(area);

    let input = Paragraph::new(format!("> {}_", app.input)).style(Style::default().fg(Color::White));
    frame.render_widget(input, main_layout[0]);

    let (feedback_text, feedback_color) = format_feedback(&app.feedback);
    let feedback = Paragraph::new(feedback_text).style(Style::default().fg(feedback_color));
    frame.render_widget(feedback, main_layout[2]);

    let state = app.snapshot().state;
    let score = Paragraph::new(format!(
        "Score: {}   Combo: x{} (best x{})",
        state.score.total_score, state.combo.combo, state.combo.max_combo
    ))
    .style(Style::default().fg(Color::Magenta).bold());
    frame.render_widget(score, main_layout[4]);
}

/// Render the activity feed, newest first
fn render_feed(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .feed
        .iter()
        .rev()
        .map(|entry| {
            let color = match entry {
                FeedEntry::Scored { .. } => Color::Green,
                FeedEntry::Missed { .. } => Color::Red,
                FeedEntry::Passed { .. } => Color::DarkGray,
            };
            ListItem::new(entry.line()).style(Style::default().fg(color))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!("Activity ({})", app.player())),
    );
    frame.render_widget(list, area);
}

/// Render the end-of-session summary
fn render_end_summary(frame: &mut Frame, area: Rect, summary: &SessionSummary) {
    let lines = vec![
        Line::from("TIME'S UP!".red().bold()),
        Line::from(""),
        Line::from(format!("Final Score: {}", summary.total_score).yellow().bold()),
        Line::from(""),
        Line::from(format!("Best Combo: x{}", summary.max_combo)),
        Line::from(format!(
            "Correct: {}  Missed: {}  Accuracy: {:.0}%",
            summary.correct,
            summary.incorrect,
            summary.accuracy()
        )),
        Line::from(format!(
            "Turns: {}  Passes: {}  Timeouts: {}",
            summary.turns_played, summary.passes, summary.timeouts
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().padding(Padding::top(1)));
    frame.render_widget(paragraph, area);
}

/// Render a halted session
fn render_fatal(frame: &mut Frame, area: Rect, message: &str) {
    let error = Paragraph::new(format!("Error: {}", message))
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center)
        .block(Block::default().padding(Padding::top(2)));
    frame.render_widget(error, area);
}

fn format_prompt(turn: Option<&Turn>) -> String {
    match turn {
        Some(turn) => format!("#{}  {}", turn.sequence_number, turn.prompt()),
        None => String::new(),
    }
}

fn prompt_color(turn: Option<&Turn>) -> Color {
    match turn.map(|t| &t.challenge) {
        Some(Challenge::Constraint { .. }) => Color::Magenta,
        _ => Color::Cyan,
    }
}

/// Format the timer display
fn format_timer(seconds: u32) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    format!("{}:{:02}", mins, secs)
}

/// Format feedback with appropriate color
fn format_feedback(feedback: &str) -> (String, Color) {
    if feedback.is_empty() {
        return (String::new(), Color::White);
    }

    let color = if feedback.starts_with("OK") {
        Color::Green
    } else if feedback.starts_with("NOPE") || feedback.starts_with("MISS") {
        Color::Red
    } else if feedback.starts_with("PASS") || feedback.starts_with("TIME") {
        Color::Yellow
    } else {
        Color::White
    };

    (feedback.to_string(), color)
}
