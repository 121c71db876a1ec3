//! Transport bar rendering.
//!
//! Displays the loaded file, playback state, position, speed and volume.

use super::format_time;
use crate::app::App;
use crate::playback::PlaybackState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Renders the transport bar at the top of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(format!(" {} ", app.file_name()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Divide into sections
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14), // Playback state
            Constraint::Length(24), // Position
            Constraint::Length(13), // Speed
            Constraint::Length(13), // Volume
            Constraint::Length(14), // Note count
            Constraint::Min(10),    // Status
        ])
        .split(inner);

    let session = app.session();
    let play_status = match session.state() {
        PlaybackState::Playing => Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Paused => Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Stopped => Span::styled(
            " [.] STOP ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let position = format!(
        "{} / {}",
        format_time(app.view().song_time()),
        format_time(session.timeline().total_duration())
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Pos: ", label),
            Span::styled(position, value.add_modifier(Modifier::BOLD)),
        ])),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Speed: ", label),
            Span::styled(format!("{:.2}x", session.speed()), value),
        ])),
        chunks[2],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Vol: ", label),
            Span::styled(format!("{:.0}%", app.volume() * 100.0), value),
        ])),
        chunks[3],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Notes: ", label),
            Span::styled(format!("{}", session.timeline().len()), value),
        ])),
        chunks[4],
    );

    if let Some(message) = app.status_message() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))),
            chunks[5],
        );
    }
}
