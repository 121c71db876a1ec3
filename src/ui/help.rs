//! Key hint line.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Key binding entry for the hint line.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Space",
        description: "Play/Pause",
    },
    KeyBinding {
        key: "s",
        description: "Stop",
    },
    KeyBinding {
        key: "r",
        description: "Restart",
    },
    KeyBinding {
        key: "←/→",
        description: "Seek",
    },
    KeyBinding {
        key: "+/-",
        description: "Speed",
    },
    KeyBinding {
        key: "[/]",
        description: "Volume",
    },
    KeyBinding {
        key: "o",
        description: "Reload",
    },
    KeyBinding {
        key: "q",
        description: "Quit",
    },
];

/// Builds the hint line, e.g. `[Space]Play/Pause [s]Stop ...`.
fn build_help_line() -> Line<'static> {
    let key_style = Style::default().fg(Color::Yellow);
    let bracket_style = Style::default().fg(Color::DarkGray);
    let desc_style = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::with_capacity(BINDINGS.len() * 3);
    for (i, binding) in BINDINGS.iter().enumerate() {
        let separator = if i + 1 < BINDINGS.len() { " " } else { "" };
        spans.push(Span::styled("[", bracket_style));
        spans.push(Span::styled(binding.key, key_style));
        spans.push(Span::styled(
            format!("]{}{}", binding.description, separator),
            desc_style,
        ));
    }
    Line::from(spans)
}

/// Renders the key hints at the bottom of the screen.
pub fn render_help_line(frame: &mut Frame, area: Rect) {
    frame.render_widget(Paragraph::new(build_help_line()), area);
}
