//! Busy spinner shown while a lookup is in flight.

use std::time::Duration;

/// Braille "dot" cycle.
pub const FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Time between frames (10 fps).
pub const INTERVAL: Duration = Duration::from_millis(100);

/// Glyph for a frame index. Wraps around.
pub fn glyph(frame: usize) -> &'static str {
    FRAMES[frame % FRAMES.len()]
}
