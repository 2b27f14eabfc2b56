//! Reusable UI component helpers

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{accent, inactive, text, text_dim};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner frame for something that has been running `elapsed_ms`
pub fn spinner(elapsed_ms: u128) -> &'static str {
    SPINNER[(elapsed_ms / 100) as usize % SPINNER.len()]
}

/// `  Label:        value`
pub fn field_line(label: &str, value: impl Into<String>, value_color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<16}", label), Style::default().fg(text_dim())),
        Span::styled(value.into(), Style::default().fg(value_color)),
    ])
}

/// `Enter submit │ Esc cancel`
pub fn hint_line(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, (key, action)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
        }
        spans.push(Span::styled(key.to_string(), Style::default().fg(accent())));
        spans.push(Span::styled(format!(" {}", action), Style::default().fg(text_dim())));
    }
    Line::from(spans)
}

pub fn section_title(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(text()).add_modifier(Modifier::BOLD),
    ))
}

/// Text field contents with a cursor when focused
pub fn input_line(value: &str, placeholder: &str, focused: bool) -> Line<'static> {
    if value.is_empty() && !focused {
        return Line::from(Span::styled(placeholder.to_string(), Style::default().fg(text_dim())));
    }
    let mut spans = vec![Span::styled(value.to_string(), Style::default().fg(text()))];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(accent())));
    }
    if value.is_empty() {
        spans.push(Span::styled(placeholder.to_string(), Style::default().fg(text_dim())));
    }
    Line::from(spans)
}

/// Clear the area and draw a bordered, wrapped popup
pub fn render_popup(f: &mut Frame, area: Rect, title: &str, color: Color, lines: Vec<Line>) {
    f.render_widget(Clear, area);

    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(title.to_string(), Style::default().fg(color)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(popup, area);
}
