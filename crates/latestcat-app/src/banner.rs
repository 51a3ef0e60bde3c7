//! Banner art and its gradient.
//!
//! The banner is static multi-line art painted one character at a time with
//! a [`ramp`](crate::color::ramp) as wide as its longest line, so every line
//! shares the same left-to-right gradient.

use std::{borrow::Cow, sync::Arc};

use ratatui::text::{Line, Span};
use thiserror::Error;

use crate::{Theme, color};

const CAT: &str = include_str!("../assets/cat.txt");

/// Motif substitutions shown when a lookup finds nothing.
const NOT_FOUND_MOTIF: [(&str, &str); 2] = [("WOW", "404"), ("O   O", "x   x")];

/// Banner loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BannerError {
    /// The art has no visible characters.
    #[error("banner art is empty")]
    Empty,
}

/// Decorative banner art. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    art: Arc<str>,
}

impl Banner {
    /// Custom art. Trailing newlines are dropped.
    pub fn new(art: &str) -> Result<Self, BannerError> {
        let art = art.trim_end_matches(['\n', '\r']);
        if art.trim().is_empty() {
            return Err(BannerError::Empty);
        }
        Ok(Self { art: Arc::from(art) })
    }

    /// The stock cat.
    pub fn cat() -> Self {
        Self { art: Arc::from(CAT.trim_end_matches(['\n', '\r'])) }
    }

    /// Raw art.
    pub fn art(&self) -> &str {
        &self.art
    }

    /// Art with the "not found" motif swapped in.
    pub fn not_found(&self) -> Cow<'_, str> {
        let mut art = Cow::Borrowed(self.art());
        for (from, to) in NOT_FOUND_MOTIF {
            if art.contains(from) {
                art = Cow::Owned(art.replace(from, to));
            }
        }
        art
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::cat()
    }
}

/// Paint `art` with the theme's gradient, one styled span per character.
pub fn paint(art: &str, theme: &Theme) -> Vec<Line<'static>> {
    let width = art.lines().map(|line| line.chars().count()).max().unwrap_or(0);
    let ramp = color::ramp(theme.gradient_start, theme.gradient_end, width);

    art.lines()
        .map(|line| {
            line.chars()
                .zip(&ramp)
                .map(|(c, rgb)| Span::styled(c.to_string(), theme.fg(*rgb)))
                .collect::<Line<'static>>()
        })
        .collect()
}
