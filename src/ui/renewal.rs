//! Popups for each step of a renewal attempt

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame,
};

use super::components::{field_line, hint_line, input_line, render_popup, section_title, spinner};
use super::{accent, bg_selected, centered_rect, danger, success, text, text_dim, warning};
use crate::app::App;
use crate::currency::format_currency;
use crate::renewal::order::{ConfirmationSummary, OrderTone};
use crate::renewal::{Pricing, RenewalStep, Selection};

pub fn draw_renewal(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 90 } else { 60 },
        area,
    );
    let title = app.renewal.title();

    let (color, lines) = match &app.renewal {
        RenewalStep::Idle => return,
        RenewalStep::PackageSelection(selection) => (accent(), selection_lines(app, selection)),
        RenewalStep::OrderCreating => (accent(), busy_lines("Creating your renewal order...")),
        RenewalStep::PaymentConfirming => (accent(), busy_lines("Verifying your payment...")),
        RenewalStep::AwaitingExternalCheckout {
            order_id,
            checkout_url,
            return_input,
        } => {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Checkout has been opened in your browser.",
                    Style::default().fg(text()).add_modifier(Modifier::BOLD),
                )),
            ];
            if let Some(id) = order_id {
                lines.push(field_line("Order ID", id.as_str(), text()));
            }
            lines.extend([
                Line::from(""),
                Line::from(Span::styled("If it did not open, visit:", Style::default().fg(text_dim()))),
                Line::from(Span::styled(checkout_url.clone(), Style::default().fg(accent()))),
                Line::from(""),
                Line::from(Span::styled(
                    "After paying, paste the address your browser was sent back to:",
                    Style::default().fg(text_dim()),
                )),
                input_line(return_input, "https://.../renewal/success?session_id=...", true),
                Line::from(""),
                hint_line(&[("Enter", "confirm (empty: reopen checkout)"), ("Esc", "abandon")]),
            ]);
            (accent(), lines)
        }
        RenewalStep::Succeeded { order } => {
            let summary = ConfirmationSummary::for_order(order);
            let headline_color = if summary.needs_manual_processing { warning() } else { success() };
            let amount = match (order.amount.as_deref(), order.currency.as_deref()) {
                (Some(amount), Some(currency)) => match amount.trim().parse::<f64>() {
                    Ok(value) => format_currency(value, currency),
                    Err(_) => format!("{} {}", amount, currency),
                },
                (Some(amount), None) => amount.to_string(),
                _ => "-".to_string(),
            };

            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    summary.headline,
                    Style::default().fg(headline_color).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(summary.body, Style::default().fg(text()))),
                Line::from(""),
                section_title("Order Details"),
                field_line("Order ID", order.order_id.as_deref().unwrap_or("-"), text()),
                field_line("ICCID", order.iccid.as_deref().unwrap_or("-"), text()),
                field_line("Provider", order.provider.as_deref().unwrap_or("-"), text()),
                field_line("Amount", amount, text()),
                field_line("Status", summary.status_label.clone(), tone_color(summary.tone)),
                Line::from(""),
            ];
            if summary.needs_manual_processing {
                lines.push(Line::from(Span::styled(
                    "Payment received successfully! There was a temporary issue with the provider API. \
                     You'll receive a confirmation email once your renewal is completed.",
                    Style::default().fg(warning()),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "A confirmation email with your eSIM details will be sent to you shortly.",
                    Style::default().fg(text_dim()),
                )));
            }
            lines.push(Line::from(""));
            if order.order_id.is_some() {
                lines.push(hint_line(&[("e", "email details"), ("Enter", "home")]));
            } else {
                lines.push(hint_line(&[("Enter", "home")]));
            }
            (headline_color, lines)
        }
        RenewalStep::Failed { message } => (
            danger(),
            vec![
                Line::from(""),
                Line::from(Span::styled(message.clone(), Style::default().fg(danger()))),
                Line::from(""),
                hint_line(&[("Enter", "return home")]),
            ],
        ),
        RenewalStep::EmailEntry {
            input,
            error,
            sending,
            ..
        } => {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Send the order details to:",
                    Style::default().fg(text()),
                )),
                input_line(input, "you@example.com", !sending),
            ];
            if let Some(err) = error {
                lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(danger()))));
            }
            lines.push(Line::from(""));
            if *sending {
                lines.push(Line::from(Span::styled("Sending...", Style::default().fg(text_dim()))));
            } else {
                lines.push(hint_line(&[("Enter", "send"), ("Esc", "skip")]));
            }
            (accent(), lines)
        }
        RenewalStep::EmailSent { recipient, .. } => (
            success(),
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("Order details sent to {}", recipient),
                    Style::default().fg(success()).add_modifier(Modifier::BOLD),
                )),
            ],
        ),
        RenewalStep::Cancelled => {
            let mut hints = vec![("Enter", "home")];
            if app.view.as_ref().is_some_and(|v| v.can_renew) {
                hints.insert(0, ("r", "try again"));
            }
            (
                danger(),
                vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "Your payment was cancelled. No charges have been made.",
                        Style::default().fg(text()),
                    )),
                    Line::from(""),
                    hint_line(&hints),
                ],
            )
        }
    };

    render_popup(f, popup_area, title, color, lines);
}

fn tone_color(tone: OrderTone) -> Color {
    match tone {
        OrderTone::Done => success(),
        OrderTone::Paid => accent(),
        OrderTone::Warning => warning(),
        OrderTone::Neutral => text_dim(),
    }
}

fn busy_lines(message: &str) -> Vec<Line<'static>> {
    let frame = spinner(std::time::UNIX_EPOCH.elapsed().map(|d| d.as_millis()).unwrap_or(0));
    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{} ", frame), Style::default().fg(accent())),
            Span::styled(message.to_string(), Style::default().fg(text())),
        ]),
    ]
}

fn selection_lines(app: &App, selection: &Selection) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];

    if let Some(view) = &app.view {
        lines.push(field_line("eSIM", view.iccid.clone(), text()));
        lines.push(field_line("Current plan", view.plan_name.clone(), text()));
        lines.push(Line::from(""));
    }

    if let Pricing::Packages { offers, selected, loading, .. } = &selection.pricing {
        lines.push(section_title("Package"));
        if *loading {
            lines.push(Line::from(Span::styled("  Loading packages...", Style::default().fg(text_dim()))));
        } else if offers.is_empty() {
            lines.push(Line::from(Span::styled("  No packages available", Style::default().fg(text_dim()))));
        } else {
            for (i, offer) in offers.iter().enumerate() {
                let data = match (offer.data_quantity.as_deref(), offer.data_unit.as_deref()) {
                    (Some(q), Some(u)) => format!("{} {}", q, u),
                    (Some(q), None) => q.to_string(),
                    _ => String::new(),
                };
                let days = offer
                    .validity_days
                    .as_deref()
                    .map(|d| format!("{} days", d))
                    .unwrap_or_default();
                let price = offer
                    .price
                    .map(|p| format_currency(p, offer.currency.as_deref().unwrap_or(selection.base_currency())))
                    .unwrap_or_default();

                let style = if i == *selected {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default().fg(text_dim())
                };
                lines.push(Line::from(Span::styled(
                    format!("  {:<28} {:>8} {:>9} {:>10}", offer.display_name(), data, days, price),
                    style,
                )));
            }
        }
        lines.push(Line::from(""));
    }

    let currency_name = selection
        .currencies
        .get(selection.currency_index)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    lines.push(Line::from(vec![
        Span::styled(format!("  {:<16}", "Currency"), Style::default().fg(text_dim())),
        Span::styled("◀ ", Style::default().fg(accent())),
        Span::styled(
            selection.currency_code().to_string(),
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ▶ ", Style::default().fg(accent())),
        Span::styled(currency_name, Style::default().fg(text_dim())),
    ]));

    let price = if selection.converting {
        "Converting...".to_string()
    } else {
        selection.price_label().unwrap_or_else(|| "-".to_string())
    };
    lines.push(field_line("Price", price, accent()));
    lines.push(Line::from(Span::styled(
        "  Converted prices are indicative; the final amount is shown at checkout.",
        Style::default().fg(text_dim()),
    )));

    if let Some(ref err) = selection.error {
        lines.push(Line::from(Span::styled(format!("  {}", err), Style::default().fg(danger()))));
    }

    lines.push(Line::from(""));
    let mut hints = vec![("←/→", "currency")];
    if matches!(selection.pricing, Pricing::Packages { .. }) {
        hints.push(("↑/↓", "package"));
    }
    hints.extend([("Enter", "checkout"), ("Esc", "cancel")]);
    lines.push(hint_line(&hints));

    lines
}
