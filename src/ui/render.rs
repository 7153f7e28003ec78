use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::app::App;
use crate::types::events::NoteEvent;
use crate::types::note::midi_note_to_note_name;

/// Render the TUI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(7), // Pitch readout
            Constraint::Length(3), // Loudness meter
            Constraint::Min(5),    // Event log
            Constraint::Length(4), // Status + help
        ])
        .split(frame.size());

    render_title(frame, chunks[0], app);
    render_pitch(frame, chunks[1], app);
    render_loudness(frame, chunks[2], app);
    render_event_log(frame, chunks[3], app);
    render_help(frame, chunks[4], app);
}

/// Render title bar with the selected devices
fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        "Pitch to MIDI  |  In: {}  |  Out: {} (ch {})",
        app.audio_device, app.midi_port, app.midi_channel
    );
    let paragraph = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}

/// Render detected pitch, note and stability
fn render_pitch(frame: &mut Frame, area: Rect, app: &App) {
    let reading = &app.reading;

    let (stability, stability_color) = if reading.is_stable {
        ("STABLE", Color::Green)
    } else if reading.midi_note >= 0 {
        ("settling", Color::Yellow)
    } else {
        ("no pitch", Color::DarkGray)
    };

    let sounding = match app.active_note {
        Some(note) => format!("{} ({})", midi_note_to_note_name(note as i32), note),
        None => "-".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled(
            reading.note_name.clone(),
            Style::default()
                .fg(stability_color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "Pitch: {:>7.2} Hz   Raw: {:>7.2} Hz   Note: {}",
            reading.pitch, app.raw_pitch, reading.midi_note
        )),
        Line::from(Span::styled(stability, Style::default().fg(stability_color))),
        Line::from(format!("Sounding: {}", sounding)),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Pitch").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Render loudness as a velocity gauge
fn render_loudness(frame: &mut Frame, area: Rect, app: &App) {
    let ratio = (app.loudness as f64 / 127.0).clamp(0.0, 1.0);

    let gauge = Gauge::default()
        .block(Block::default().title("Velocity").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .label(format!("{}/127", app.loudness))
        .ratio(ratio);

    frame.render_widget(gauge, area);
}

/// Render recent note events, newest first
fn render_event_log(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .recent_events
        .iter()
        .map(|event| {
            let (label, color) = match event {
                NoteEvent::NoteOn { .. } => ("ON ", Color::Green),
                NoteEvent::NoteOff { .. } => ("OFF", Color::Red),
            };
            let velocity = match event {
                NoteEvent::NoteOn { velocity, .. } | NoteEvent::NoteOff { velocity, .. } => *velocity,
            };
            ListItem::new(format!(
                "{}  {:<4} ({:>3})  vel {:>3}",
                label,
                midi_note_to_note_name(event.note() as i32),
                event.note(),
                velocity
            ))
            .style(Style::default().fg(color))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!("Events ({} frames)", app.frames))
            .borders(Borders::ALL),
    );

    frame.render_widget(list, area);
}

/// Render status line and help text
fn render_help(frame: &mut Frame, area: Rect, app: &App) {
    let status = match &app.status {
        Some(status) => Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))),
        None => Line::from("Listening..."),
    };

    let help_text = vec![
        status,
        Line::from("  R: Reset  |  P: Panic (all notes off)  |  Q/Esc: Quit"),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));

    frame.render_widget(paragraph, area);
}
