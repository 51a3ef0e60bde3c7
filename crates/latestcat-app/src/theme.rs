//! Per-session styling.
//!
//! A [`Theme`] is resolved once per connection from the terminal type the
//! client negotiated and then threaded into the renderer. Colors are authored
//! as 24-bit [`Rgb`] and downgraded to whatever the [`ColorProfile`] supports.

use ratatui::style::{Color, Style};

use crate::color::Rgb;

/// Banner gradient start (purple).
pub const GRADIENT_START: Rgb = Rgb::new(0xb1, 0x4f, 0xff);
/// Banner gradient end (mint).
pub const GRADIENT_END: Rgb = Rgb::new(0x00, 0xff, 0xa3);
/// Spinner color (xterm 205).
pub const SPINNER: Rgb = Rgb::new(0xff, 0x5f, 0xaf);

/// xterm's 16-color palette, indexed 0..16.
const ANSI_PALETTE: [(Rgb, Color); 16] = [
    (Rgb::new(0x00, 0x00, 0x00), Color::Black),
    (Rgb::new(0x80, 0x00, 0x00), Color::Red),
    (Rgb::new(0x00, 0x80, 0x00), Color::Green),
    (Rgb::new(0x80, 0x80, 0x00), Color::Yellow),
    (Rgb::new(0x00, 0x00, 0x80), Color::Blue),
    (Rgb::new(0x80, 0x00, 0x80), Color::Magenta),
    (Rgb::new(0x00, 0x80, 0x80), Color::Cyan),
    (Rgb::new(0xc0, 0xc0, 0xc0), Color::Gray),
    (Rgb::new(0x80, 0x80, 0x80), Color::DarkGray),
    (Rgb::new(0xff, 0x00, 0x00), Color::LightRed),
    (Rgb::new(0x00, 0xff, 0x00), Color::LightGreen),
    (Rgb::new(0xff, 0xff, 0x00), Color::LightYellow),
    (Rgb::new(0x00, 0x00, 0xff), Color::LightBlue),
    (Rgb::new(0xff, 0x00, 0xff), Color::LightMagenta),
    (Rgb::new(0x00, 0xff, 0xff), Color::LightCyan),
    (Rgb::new(0xff, 0xff, 0xff), Color::White),
];

/// Channel values of the 6x6x6 cube in the 256-color palette.
const CUBE_LEVELS: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

/// Color capability of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorProfile {
    /// 24-bit color.
    TrueColor,
    /// xterm 256-color palette.
    Ansi256,
    /// Basic 16 colors.
    Ansi16,
    /// No color at all.
    Monochrome,
}

impl ColorProfile {
    /// Guess the profile from a negotiated terminal type (e.g.
    /// `XTERM-256COLOR`). Unknown or empty types get 256 colors.
    pub fn from_terminal_type(term: &str) -> Self {
        let term = term.to_ascii_lowercase();
        let truecolor = ["truecolor", "24bit", "direct", "kitty", "alacritty", "wezterm", "ghostty"];

        if term.is_empty() || term == "unknown" {
            Self::Ansi256
        } else if term == "dumb" {
            Self::Monochrome
        } else if truecolor.iter().any(|t| term.contains(t)) {
            Self::TrueColor
        } else if term.contains("256") {
            Self::Ansi256
        } else {
            Self::Ansi16
        }
    }

    /// Downgrade `rgb` to this profile. `None` means "no color".
    pub fn convert(self, rgb: Rgb) -> Option<Color> {
        match self {
            Self::TrueColor => Some(Color::Rgb(rgb.r, rgb.g, rgb.b)),
            Self::Ansi256 => Some(Color::Indexed(ansi256(rgb))),
            Self::Ansi16 => Some(ansi16(rgb)),
            Self::Monochrome => None,
        }
    }
}

/// Styling resolved for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Color capability of the client terminal.
    pub profile: ColorProfile,
    /// Left end of the banner gradient.
    pub gradient_start: Rgb,
    /// Right end of the banner gradient.
    pub gradient_end: Rgb,
    /// Spinner glyph color.
    pub spinner: Rgb,
}

impl Theme {
    /// Default palette with the given profile.
    pub fn new(profile: ColorProfile) -> Self {
        Self { profile, gradient_start: GRADIENT_START, gradient_end: GRADIENT_END, spinner: SPINNER }
    }

    /// Default palette for a negotiated terminal type.
    pub fn for_terminal(term: &str) -> Self {
        Self::new(ColorProfile::from_terminal_type(term))
    }

    /// Foreground style for `rgb`, downgraded to the profile.
    pub fn fg(&self, rgb: Rgb) -> Style {
        self.profile.convert(rgb).map_or_else(Style::default, |color| Style::default().fg(color))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ColorProfile::TrueColor)
    }
}

fn squared_distance(a: Rgb, b: Rgb) -> u32 {
    let d = |x: u8, y: u8| u32::from(x.abs_diff(y)).pow(2);
    d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
}

fn ansi256(rgb: Rgb) -> u8 {
    let level = |v: u8| match v {
        0..48 => 0,
        48..115 => 1,
        _ => (v - 35) / 40,
    };
    let (r, g, b) = (level(rgb.r), level(rgb.g), level(rgb.b));
    let cube = Rgb::new(CUBE_LEVELS[r as usize], CUBE_LEVELS[g as usize], CUBE_LEVELS[b as usize]);
    let cube_index = 16 + 36 * r + 6 * g + b;

    let average = (u16::from(rgb.r) + u16::from(rgb.g) + u16::from(rgb.b)) / 3;
    let gray_step = (if average > 238 { 23 } else { average.saturating_sub(3) / 10 }) as u8;
    let gray_level = 8 + 10 * gray_step;
    let gray = Rgb::new(gray_level, gray_level, gray_level);

    if squared_distance(rgb, gray) < squared_distance(rgb, cube) {
        232 + gray_step
    } else {
        cube_index
    }
}

fn ansi16(rgb: Rgb) -> Color {
    ANSI_PALETTE
        .iter()
        .min_by_key(|(palette, _)| squared_distance(rgb, *palette))
        .map_or(Color::Reset, |(_, color)| *color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_from_terminal_type() {
        assert_eq!(ColorProfile::from_terminal_type("XTERM-256COLOR"), ColorProfile::Ansi256);
        assert_eq!(ColorProfile::from_terminal_type("xterm-kitty"), ColorProfile::TrueColor);
        assert_eq!(ColorProfile::from_terminal_type("xterm-direct"), ColorProfile::TrueColor);
        assert_eq!(ColorProfile::from_terminal_type("vt100"), ColorProfile::Ansi16);
        assert_eq!(ColorProfile::from_terminal_type("dumb"), ColorProfile::Monochrome);
        assert_eq!(ColorProfile::from_terminal_type(""), ColorProfile::Ansi256);
    }

    #[test]
    fn spinner_maps_to_xterm_205() {
        assert_eq!(ColorProfile::Ansi256.convert(SPINNER), Some(Color::Indexed(205)));
    }

    #[test]
    fn grays_map_to_gray_ramp() {
        assert_eq!(ColorProfile::Ansi256.convert(Rgb::new(128, 128, 128)), Some(Color::Indexed(244)));
    }

    #[test]
    fn ansi16_picks_nearest() {
        assert_eq!(ColorProfile::Ansi16.convert(Rgb::new(250, 10, 10)), Some(Color::LightRed));
        assert_eq!(ColorProfile::Ansi16.convert(Rgb::new(5, 5, 5)), Some(Color::Black));
    }

    #[test]
    fn monochrome_drops_color() {
        assert_eq!(Theme::for_terminal("dumb").fg(SPINNER), Style::default());
    }

    #[test]
    fn truecolor_keeps_rgb() {
        assert_eq!(Theme::default().fg(GRADIENT_END), Style::default().fg(Color::Rgb(0, 255, 163)));
    }
}
