use super::{DisplaySurface, Frame};
use std::io::{self, IsTerminal, Write};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub struct TerminalSurface {
    interactive: bool,
    show_countdown: bool,
    last_balances: Option<String>,
}

impl TerminalSurface {
    pub fn new(show_countdown: bool) -> Self {
        Self {
            interactive: io::stdout().is_terminal(),
            show_countdown,
            last_balances: None,
        }
    }

    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let balances = frame.balances_text();
        let mut out = io::stdout().lock();

        if self.interactive {
            write!(out, "{CLEAR_SCREEN}{balances}")?;
            if self.show_countdown {
                let countdown = frame.countdown_text();
                if !countdown.is_empty() {
                    write!(out, "\n\n{countdown}")?;
                }
            }
            writeln!(out)?;
        } else if self.last_balances.as_deref() != Some(balances.as_str()) {
            let stamp = chrono::Local::now().format("%H:%M:%S");
            writeln!(out, "[{stamp}] {}", balances.replace('\n', " | "))?;
        }

        out.flush()?;
        self.last_balances = Some(balances);
        Ok(())
    }
}

impl DisplaySurface for TerminalSurface {
    fn render(&mut self, frame: &Frame) {
        if let Err(e) = self.write_frame(frame) {
            tracing::warn!(error = %e, "Failed to draw balances");
        }
    }
}
