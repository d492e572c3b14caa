// Terminal console: last command sent, last telemetry received, key echo, help
use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use tracing::warn;

use crate::keymap::HELP;
use crate::messages::TelemetryMessage;

const TITLE: &str = "QuickBot Control";
const TITLE_ROW: u16 = 0;
const SENT_ROW: u16 = 1;
const RECEIVE_ROW: u16 = 2;
const POWER_ROW: u16 = 3;

// Used when the terminal size can't be queried
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Console contents plus the writer it renders into
pub struct Console<W: Write> {
    out: W,
    painted: bool,
    sent: String,
    received: String,
    power: String,
    prompt: String,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            painted: false,
            sent: String::new(),
            received: String::new(),
            power: String::new(),
            prompt: String::new(),
        }
    }

    /// Last wire command, or the reason it failed to go out
    pub fn sent(&mut self, text: &str) {
        self.sent = text.trim_end().to_string();
    }

    pub fn received(&mut self, msg: &TelemetryMessage) {
        self.received = msg.to_string();
    }

    pub fn power(&mut self, left: i32, right: i32) {
        self.power = format!("L={} R={}", left, right);
    }

    /// Echo a key on the prompt row; `None` clears it
    pub fn prompt(&mut self, echo: Option<char>) {
        self.prompt = echo.map(String::from).unwrap_or_default();
    }

    pub fn render(&mut self) -> io::Result<()> {
        let (cols, rows) = terminal::size().unwrap_or(FALLBACK_SIZE);
        let width = cols as usize;

        // Wipe whatever the shell left behind before the first frame
        if !self.painted {
            queue!(self.out, Clear(ClearType::All))?;
            self.painted = true;
        }

        queue!(self.out, MoveTo(0, TITLE_ROW))?;
        reverse_line(&mut self.out, TITLE, width)?;

        for (row, label, value) in [
            (SENT_ROW, "Sent    : ", &self.sent),
            (RECEIVE_ROW, "Received: ", &self.received),
            (POWER_ROW, "Power   : ", &self.power),
        ] {
            queue!(
                self.out,
                MoveTo(0, row),
                Clear(ClearType::CurrentLine),
                Print(label),
                Print(value)
            )?;
        }

        let help_top = rows.saturating_sub(HELP.len() as u16);
        queue!(
            self.out,
            MoveTo(0, help_top.saturating_sub(1)),
            Clear(ClearType::CurrentLine),
            Print("> "),
            Print(&self.prompt)
        )?;
        for (i, line) in HELP.iter().enumerate() {
            queue!(self.out, MoveTo(0, help_top + i as u16))?;
            reverse_line(&mut self.out, line, width)?;
        }

        self.out.flush()
    }
}

fn reverse_line<W: Write>(out: &mut W, text: &str, width: usize) -> io::Result<()> {
    let padded = format!("{:<width$}", text, width = width.saturating_sub(1));
    queue!(
        out,
        SetAttribute(Attribute::Reverse),
        Print(padded),
        SetAttribute(Attribute::Reset)
    )
}

/// Raw mode and alternate screen for the session's lifetime
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(console: &mut Console<Vec<u8>>) -> String {
        console.out.clear();
        console.render().unwrap();
        String::from_utf8_lossy(&console.out).into_owned()
    }

    #[test]
    fn test_render_shows_rows() {
        let mut console = Console::new(Vec::new());
        console.sent("$PWM=49,0*\n");
        console.received(&TelemetryMessage::new(b"[1, 2, 3]\n".to_vec()));
        console.power(49, 0);
        console.prompt(Some('a'));

        let screen = rendered(&mut console);
        assert!(screen.contains(TITLE));
        assert!(screen.contains("Sent    : $PWM=49,0*"));
        assert!(screen.contains("Received: [1, 2, 3]"));
        assert!(screen.contains("Power   : L=49 R=0"));
        assert!(screen.contains("> a"));
        assert!(screen.contains(HELP[1]));
    }

    #[test]
    fn test_first_frame_clears_whole_screen() {
        let clear_all = {
            let mut bytes = Vec::new();
            queue!(bytes, Clear(ClearType::All)).unwrap();
            String::from_utf8(bytes).unwrap()
        };
        let mut console = Console::new(Vec::new());
        assert!(rendered(&mut console).contains(&clear_all));
        assert!(!rendered(&mut console).contains(&clear_all));
    }

    #[test]
    fn test_prompt_clears() {
        let mut console = Console::new(Vec::new());
        console.prompt(Some('k'));
        console.prompt(None);
        let screen = rendered(&mut console);
        assert!(!screen.contains("> k"));
    }
}
