mod components;
mod renewal;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::{loading_message, App, Popup, Screen};
use crate::present::{StatusTone, NOT_AVAILABLE};
use crate::theme::theme;
use components::{field_line, hint_line, input_line, section_title, spinner};

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn accent_bright() -> Color { theme().accent_bright }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(8),    // Screen body
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    match app.screen {
        Screen::Lookup => draw_lookup(f, app, chunks[1]),
        Screen::Results => draw_results(f, app, chunks[1]),
    }
    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    if !app.renewal.is_idle() {
        renewal::draw_renewal(f, app);
    } else if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status message > background work > info message > ready
    let line = if let Some(ref status) = app.status_message {
        Line::from(vec![Span::styled(status, Style::default().fg(warning()))])
    } else if app.is_busy() {
        Line::from(vec![Span::styled("Working...", Style::default().fg(text_dim()))])
    } else if let Some(ref info) = app.info_message {
        Line::from(vec![Span::styled(info, Style::default().fg(text_dim()))])
    } else {
        Line::from(vec![Span::styled("Ready", Style::default().fg(text_dim()))])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_lookup(f: &mut Frame, app: &App, area: Rect) {
    let width = if area.width < 80 { 95 } else { 70 };
    let column = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Percentage((100 - width) / 2),
        ])
        .split(area)[1];

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Title
            Constraint::Length(3), // ICCID input
            Constraint::Min(3),    // Loading / error / hint
        ])
        .split(column);

    let title = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "eSIM Status Check",
            Style::default().fg(accent_bright()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Look up usage, validity and renewal options by ICCID",
            Style::default().fg(text_dim()),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let focused = !app.is_loading() && app.renewal.is_idle() && app.popup == Popup::None;
    let border = if focused { accent() } else { inactive() };
    let input = Paragraph::new(input_line(&app.iccid_input, "e.g. 8934 0710 1001 2043 449", focused)).block(
        Block::default()
            .title(Span::styled(" ICCID ", Style::default().fg(border)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(input, chunks[1]);

    let mut lines = vec![Line::from("")];
    if let Some(started) = app.lookup_started {
        let elapsed = started.elapsed();
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", spinner(elapsed.as_millis())), Style::default().fg(accent())),
            Span::styled(loading_message(elapsed), Style::default().fg(text())),
            Span::styled(format!("  {}s", elapsed.as_secs()), Style::default().fg(text_dim())),
        ]));
        lines.push(Line::from(Span::styled(
            "Searching every provider can take a few minutes.",
            Style::default().fg(text_dim()),
        )));
    } else if let Some(ref err) = app.lookup_error {
        lines.push(Line::from(Span::styled(
            err.headline.clone(),
            Style::default().fg(danger()).add_modifier(Modifier::BOLD),
        )));
        if let Some(ref details) = err.details {
            lines.push(Line::from(Span::styled(details.clone(), Style::default().fg(text()))));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "Enter the ICCID printed on your eSIM card or QR code (at least 10 digits).",
            Style::default().fg(text_dim()),
        )));
        lines.push(Line::from(Span::styled(
            "Spaces and hyphens are ignored.",
            Style::default().fg(text_dim()),
        )));
    }

    let message = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(message, chunks[2]);
}

fn draw_results(f: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.view else {
        return;
    };

    // Stack the cards on narrow terminals
    let direction = if area.width < 90 { Direction::Vertical } else { Direction::Horizontal };
    let chunks = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    draw_details_card(f, view, chunks[0]);
    draw_usage_card(f, view, chunks[1]);
}

fn status_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Active => success(),
        StatusTone::Attention => warning(),
    }
}

fn na_color(value: &str) -> Color {
    if value == NOT_AVAILABLE { text_dim() } else { text() }
}

fn draw_details_card(f: &mut Frame, view: &crate::present::ResultsView, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" eSIM Details ", Style::default().fg(accent()).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("  {:<16}", "Status"), Style::default().fg(text_dim())),
            Span::styled(
                format!(" {} ", view.status.to_uppercase()),
                Style::default()
                    .fg(status_color(view.status_tone))
                    .bg(bg_selected())
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
    ];

    let fields = [
        ("ICCID", &view.iccid),
        ("Order/SIM ID", &view.order_sim_id),
        ("Provider", &view.provider),
        ("Plan", &view.plan_name),
        ("Purchased", &view.purchase_date),
        ("Validity", &view.validity),
        ("Capacity", &view.capacity),
        ("Activation code", &view.activation_code),
        ("APN", &view.apn),
    ];
    for (label, value) in fields {
        lines.push(field_line(label, value.as_str(), na_color(value)));
    }

    if view.can_renew {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  This eSIM can be renewed. Press ", Style::default().fg(warning())),
            Span::styled("r", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" to renew.", Style::default().fg(warning())),
        ]));
    }

    let details = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(details, area);
}

fn draw_usage_card(f: &mut Frame, view: &crate::present::ResultsView, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Data Usage ", Style::default().fg(accent()).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(inner);

    match &view.usage {
        Some(usage) => {
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .title(Span::styled(" Remaining ", Style::default().fg(text_dim())))
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(inactive())),
                )
                .gauge_style(Style::default().fg(theme().chart_remaining).bg(theme().chart_consumed))
                .ratio(usage.remaining_ratio())
                .label(format!(
                    "{:.2} {} left, {:.2} {} used",
                    usage.remaining, usage.unit, usage.consumed, usage.unit
                ));
            f.render_widget(gauge, chunks[0]);
        }
        None => {
            let placeholder = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled("No usage data available", Style::default().fg(text_dim()))),
            ])
            .alignment(Alignment::Center);
            f.render_widget(placeholder, chunks[0]);
        }
    }

    let total = if view.total_capacity > 0.0 {
        format!("{:.2}", view.total_capacity)
    } else {
        NOT_AVAILABLE.to_string()
    };
    let lines = vec![
        field_line("Consumed", view.data_consumed.as_str(), na_color(&view.data_consumed)),
        field_line("Remaining", view.data_remaining.as_str(), na_color(&view.data_remaining)),
        field_line("Total capacity", total.clone(), na_color(&total)),
        Line::from(""),
        field_line("Last updated", view.last_updated.as_str(), text_dim()),
    ];
    f.render_widget(Paragraph::new(lines), chunks[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.screen {
        Screen::Lookup => vec![
            ("Enter", "Check"),
            ("F2", "Health"),
            ("?", "Help"),
            ("Esc", "Clear"),
            ("Ctrl+C", "Quit"),
        ],
        Screen::Results => {
            let mut hints = vec![("n", "New lookup"), ("R", "Refresh")];
            if app.view.as_ref().is_some_and(|v| v.can_renew) {
                hints.push(("r", "Renew"));
            }
            hints.extend([("F2", "Health"), ("h", "Help"), ("q", "Quit")]);
            hints
        }
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 3 } else if area.width < 80 { 4 } else { hints.len() };

    // Footer is commands legend ONLY - no status messages here
    let footer = Paragraph::new(hint_line(&hints[..max_hints.min(hints.len())]))
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 40 { 95 } else { 80 },
        area,
    );

    let key = |k: &str, desc: &str| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", k), Style::default().fg(accent())),
            Span::raw(desc.to_string()),
        ])
    };

    let help_text = vec![
        section_title("═══ Lookup ═══"),
        key("Enter", "Check the ICCID (spaces and hyphens ignored)"),
        key("Esc", "Clear input, or back to the last result"),
        key("F2", "Check backend health"),
        Line::from(""),
        section_title("═══ Results ═══"),
        key("n / Esc", "New lookup"),
        key("R", "Refresh from the backend"),
        key("r", "Renew (expired, inactive or disabled eSIMs)"),
        Line::from(""),
        section_title("═══ Renewal ═══"),
        key("←/→", "Choose currency (display only)"),
        key("↑/↓", "Choose package"),
        key("Enter", "Create order and open checkout in the browser"),
        Line::from("              After paying, paste the return address to confirm"),
        key("e", "Email order details after a successful payment"),
        Line::from(""),
        section_title("═══ Command line ═══"),
        key("--check ID", "Print the status check as JSON"),
        key("--confirm S", "Confirm a checkout session"),
        key("--return-url", "Open the dashboard at a checkout return address"),
        key("--health", "Print backend health"),
        Line::from(""),
        hint_line(&[("?/Esc", "close")]),
    ];

    components::render_popup(f, popup_area, " eSIM Status Help ", accent(), help_text);
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
