//! Screen rendering
//!
//! Converts [`Session`] state into terminal output using ratatui widgets.
//! All functions are pure (no I/O), taking state and returning widget trees.

use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Padding, Paragraph},
};

use crate::{Phase, Session, Theme, banner, spinner};

const WELCOME: &str = "Hello there! Welcome to latest.cat 🐈‍!";
const PROMPT_QUESTION: &str = "What software are you looking for?";
const PROMPT: &str = "> ";

/// Draw the whole screen into `frame`.
pub fn draw(frame: &mut Frame, session: &Session, theme: &Theme) {
    let block = Block::default().padding(Padding::new(2, 2, 0, 2));
    let paragraph = Paragraph::new(render(session, theme)).block(block);
    frame.render_widget(paragraph, frame.area());
}

/// Screen contents for the current phase: banner, spacing, then the phase
/// body. Closed sessions render nothing.
pub fn render(session: &Session, theme: &Theme) -> Text<'static> {
    if session.is_closed() {
        return Text::default();
    }

    let banner = &session.config().banner;
    let art = match session.phase() {
        Phase::NotFound { .. } => banner.not_found(),
        _ => banner.art().into(),
    };

    let mut lines = vec![Line::default()];
    lines.extend(banner::paint(&art, theme));
    lines.extend([Line::default(), Line::default()]);
    lines.extend(body(session, theme));
    Text::from(lines)
}

fn body(session: &Session, theme: &Theme) -> Vec<Line<'static>> {
    match session.phase() {
        Phase::Idle => vec![
            Line::styled(WELCOME, Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
            Line::default(),
            Line::raw(PROMPT_QUESTION),
            Line::default(),
            input_line(session),
        ],
        Phase::Loading { query, .. } => vec![Line::from(vec![
            Span::styled(spinner::glyph(session.spinner_frame()), theme.fg(theme.spinner)),
            Span::raw(format!(" Fetching latest version for {query}...")),
        ])],
        Phase::Found { release, countdown, .. } => vec![
            Line::from(vec![
                Span::raw("Latest version for "),
                Span::styled(release.name.clone(), emphasis()),
                Span::raw(" is "),
                Span::styled(
                    release.version.clone(),
                    Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                ),
            ]),
            Line::default(),
            closing_line(*countdown),
        ],
        Phase::NotFound { query, countdown } => vec![
            Line::from(vec![
                Span::raw("😿 No software found for "),
                Span::styled(query.clone(), emphasis()),
            ]),
            Line::default(),
            closing_line(*countdown),
        ],
        Phase::Closing { .. } => vec![],
    }
}

fn emphasis() -> Style {
    Style::default().add_modifier(Modifier::BOLD | Modifier::ITALIC)
}

fn closing_line(countdown: u32) -> Line<'static> {
    Line::raw(format!("Closing in {countdown}s 👋"))
}

/// Prompt plus the visible window of the input field. An empty field shows
/// the placeholder, dimmed, with the cursor on its first character.
fn input_line(session: &Session) -> Line<'static> {
    let input = session.input();
    let cursor_style = if session.cursor_visible() && session.input_focused() {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut spans = vec![Span::raw(PROMPT)];

    if input.is_empty() {
        let placeholder = &session.config().placeholder;
        let mut chars = placeholder.chars();
        let first = chars.next().unwrap_or(' ');
        spans.push(Span::styled(first.to_string(), cursor_style.patch(dim)));
        spans.push(Span::styled(chars.collect::<String>(), dim));
        return Line::from(spans);
    }

    let window = input.window(session.config().input_width);
    spans.push(Span::raw(window.before));
    spans.push(Span::styled(window.at.unwrap_or(' ').to_string(), cursor_style));
    spans.push(Span::raw(window.after));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::{KeyInput, Release, SessionConfig, SessionEvent};

    fn session() -> Session {
        Session::new(SessionConfig::default(), "xterm-256color".into(), (80, 40))
    }

    fn plain(text: &Text<'_>) -> String {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn submit(session: &mut Session, query: &str) {
        for c in query.chars() {
            let _ = session.handle(SessionEvent::Key(KeyInput::Char(c)));
        }
        let _ = session.handle(SessionEvent::Key(KeyInput::Enter));
    }

    #[test]
    fn idle_shows_welcome_and_placeholder() {
        let text = plain(&render(&session(), &Theme::default()));

        assert!(text.starts_with('\n'));
        assert!(text.contains("WOW"));
        assert!(text.contains(WELCOME));
        assert!(text.contains(PROMPT_QUESTION));
        assert!(text.ends_with("> Python"));
    }

    #[test]
    fn banner_then_two_blank_lines() {
        let s = session();
        let text = render(&s, &Theme::default());
        let art_lines = s.config().banner.art().lines().count();

        assert_eq!(text.lines[0], Line::default());
        assert_eq!(text.lines[art_lines + 1], Line::default());
        assert_eq!(text.lines[art_lines + 2], Line::default());
    }

    #[test]
    fn typed_input_replaces_placeholder() {
        let mut s = session();
        for c in "Rust".chars() {
            let _ = s.handle(SessionEvent::Key(KeyInput::Char(c)));
        }

        let text = plain(&render(&s, &Theme::default()));
        assert!(text.ends_with("> Rust "));
        assert!(!text.contains("Python"));
    }

    #[test]
    fn long_input_scrolls() {
        let mut s = session();
        let typed: String = ('a'..='z').collect();
        for c in typed.chars() {
            let _ = s.handle(SessionEvent::Key(KeyInput::Char(c)));
        }

        let text = plain(&render(&s, &Theme::default()));
        let last = text.lines().last().unwrap_or_default();
        assert_eq!(last, "> hijklmnopqrstuvwxyz ");
    }

    #[test]
    fn loading_shows_spinner_and_query() {
        let mut s = session();
        submit(&mut s, "Python");

        let text = plain(&render(&s, &Theme::default()));
        assert!(text.ends_with("⣾ Fetching latest version for Python..."));

        let _ = s.handle(SessionEvent::SpinnerTick);
        let text = plain(&render(&s, &Theme::default()));
        assert!(text.ends_with("⣽ Fetching latest version for Python..."));
    }

    #[test]
    fn found_shows_release_and_countdown() {
        let mut s = session();
        submit(&mut s, "Python");
        let release =
            Release { slug: "python".into(), name: "Python".into(), version: "3.12.1".into() };
        let _ = s.handle(SessionEvent::LookupCompleted { generation: 1, result: Ok(Some(release)) });

        let text = plain(&render(&s, &Theme::default()));
        assert!(text.contains("Latest version for Python is 3.12.1"));
        assert!(text.ends_with("Closing in 5s 👋"));
        assert!(text.contains("WOW"));
    }

    #[test]
    fn not_found_swaps_banner() {
        let mut s = session();
        submit(&mut s, "doesnotexist123");
        let _ = s.handle(SessionEvent::LookupCompleted { generation: 1, result: Ok(None) });
        let _ = s.handle(SessionEvent::CountdownTick);

        let text = plain(&render(&s, &Theme::default()));
        assert!(text.contains("😿 No software found for doesnotexist123"));
        assert!(text.contains("404"));
        assert!(!text.contains("WOW"));
        assert!(text.ends_with("Closing in 4s 👋"));
    }

    #[test]
    fn closed_session_renders_nothing() {
        let mut s = session();
        let _ = s.handle(SessionEvent::Key(KeyInput::Esc));
        assert!(render(&s, &Theme::default()).lines.is_empty());
    }

    #[test]
    fn draw_applies_padding() {
        let backend = TestBackend::new(80, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        let s = session();

        terminal.draw(|frame| draw(frame, &s, &Theme::default())).unwrap();

        let buffer = terminal.backend().buffer();
        // Top row is the leading blank line, left padding is two columns.
        let row = |y: u16| (0..80).map(|x| buffer[(x, y)].symbol()).collect::<String>();
        assert!(row(0).trim().is_empty());
        assert!(row(1).starts_with("  "));
        assert!(!row(1).trim().is_empty());
    }
}
