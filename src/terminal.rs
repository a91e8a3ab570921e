//! Terminal presentation of a framebuffer and key handling

use crate::math::Rgb8;
use crate::renderer::Framebuffer;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::fmt::Write as _;
use std::io::{self, stdout, BufWriter, Stdout, Write};
use std::time::Duration;

/// Terminal display handler with buffered output
pub struct TerminalDisplay {
    width: u16,
    height: u16,
    buffer: BufWriter<Stdout>,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        // Size is only reliable once the alternate screen is active
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;

        // Start the preview from a blank screen
        execute!(stdout, terminal::Clear(terminal::ClearType::All))?;

        let (width, height) = terminal::size()?;

        Ok(Self {
            width,
            // leave room for the status line
            height: height.saturating_sub(2),
            buffer: BufWriter::new(stdout),
        })
    }

    /// Usable size in character cells
    pub fn get_size(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }

    /// Draw pre-rendered lines and a status line, each at an absolute cursor
    /// position so an overlong line cannot shift the rest
    pub fn render(&mut self, content: &str, status: &str) -> io::Result<()> {
        // \x1b[?25l hides the cursor, \x1b[?7l turns off line wrap
        write!(self.buffer, "\x1b[?25l\x1b[?7l")?;

        for (i, line) in content.lines().enumerate() {
            // \x1b[{row};1H moves to column 1 of the 1-based row
            write!(self.buffer, "\x1b[{};1H{}", i + 1, line)?;
        }

        // \x1b[0m drops the last pixel colors, \x1b[J erases below the image
        write!(self.buffer, "\x1b[0m\x1b[J")?;

        // Status goes on the row after the image, \x1b[K clears what was there
        let status_row = content.lines().count() + 1;
        write!(self.buffer, "\x1b[{};1H\x1b[K{}", status_row, status)?;

        // \x1b[?25h shows the cursor again, \x1b[?7h restores line wrap
        write!(self.buffer, "\x1b[?25h\x1b[?7h")?;

        self.buffer.flush()
    }

    /// Check for keyboard input
    pub fn poll_input(&self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if event::poll(timeout)? {
            if let Event::Key(key_event) = event::read()? {
                return Ok(Some(key_event));
            }
        }
        Ok(None)
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        // Pending output must land before the main screen comes back
        let _ = self.buffer.flush();
        let _ = execute!(stdout(), LeaveAlternateScreen);
    }
}

/// Key actions for the preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    Quit,
}

pub fn parse_key_event(event: KeyEvent) -> Action {
    match event.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

/// Encode a framebuffer as 24-bit color half-block text.
///
/// Each character cell carries two vertically stacked pixels: the upper one as
/// the foreground of `▀`, the lower one as the background. An odd last row is
/// paired with black.
pub fn to_halfblock(framebuffer: &Framebuffer) -> String {
    let width = framebuffer.width();
    let height = framebuffer.height();
    let mut result = String::with_capacity(width * height.div_ceil(2) * 20);

    let mut last: Option<(Rgb8, Rgb8)> = None;
    for y in (0..height).step_by(2) {
        for x in 0..width {
            let top = framebuffer.get(x, y).unwrap_or_default();
            let bottom = framebuffer.get(x, y + 1).unwrap_or_default();

            match last {
                Some((fg, bg)) if fg == top && bg == bottom => {}
                Some((fg, _)) if fg == top => {
                    let _ = write!(result, "\x1b[48;2;{};{};{}m", bottom.r, bottom.g, bottom.b);
                }
                Some((_, bg)) if bg == bottom => {
                    let _ = write!(result, "\x1b[38;2;{};{};{}m", top.r, top.g, top.b);
                }
                _ => {
                    let _ = write!(
                        result,
                        "\x1b[38;2;{};{};{};48;2;{};{};{}m",
                        top.r, top.g, top.b, bottom.r, bottom.g, bottom.b
                    );
                }
            }
            last = Some((top, bottom));
            result.push('\u{2580}');
        }
        result.push('\n');
    }

    result.push_str("\x1b[0m");
    result
}
