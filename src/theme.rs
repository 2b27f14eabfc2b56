//! Dashboard colours: a built-in palette with optional `[theme]` overrides
//! from the config file (`#RRGGBB` or `#RGB`).

use ratatui::style::Color;
use std::sync::OnceLock;

use crate::config::ThemeConfig;

/// Theme colors for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,           // Active borders, input focus, key hints
    pub accent_bright: Color,    // Titles
    pub danger: Color,           // Errors, failed states
    pub success: Color,          // Active eSIMs, completed payments
    pub warning: Color,          // Renewable statuses, pending processing
    pub text: Color,             // Primary text
    pub text_dim: Color,         // Labels, hints
    pub bg_selected: Color,      // Selection background
    pub inactive: Color,         // Inactive borders
    pub chart_consumed: Color,   // Usage gauge, consumed part
    pub chart_remaining: Color,  // Usage gauge, remaining part
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(8, 145, 178),
            accent_bright: Color::Rgb(137, 180, 250),
            danger: Color::Rgb(239, 68, 68),
            success: Color::Rgb(16, 185, 129),
            warning: Color::Rgb(245, 158, 11),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            chart_consumed: Color::Rgb(79, 195, 247),
            chart_remaining: Color::Rgb(102, 187, 106),
        }
    }
}

impl Theme {
    /// Built-in palette with whatever the config overrides
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut theme = Self::default();

        let overrides = [
            (&config.accent, &mut theme.accent, "accent"),
            (&config.success, &mut theme.success, "success"),
            (&config.warning, &mut theme.warning, "warning"),
            (&config.danger, &mut theme.danger, "danger"),
            (&config.text, &mut theme.text, "text"),
        ];
        for (value, slot, name) in overrides {
            let Some(value) = value else { continue };
            match parse_hex_color(value) {
                Some(color) => *slot = color,
                None => tracing::warn!("Ignoring invalid theme colour {} = {:?}", name, value),
            }
        }

        theme
    }
}

/// Parse a hex color string (#RRGGBB or #RGB)
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return None;
    }

    if s.len() == 6 {
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
        let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
        let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
        Some(Color::Rgb(r, g, b))
    } else {
        None
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the configured theme; only the first call wins
pub fn init(config: &ThemeConfig) {
    let _ = THEME.set(Theme::from_config(config));
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}
