//! Operator-facing console output: startup lines, progress, commit notices
//! and the final summary.

use crate::utils::progress::{self, ProgressBar};
use std::io::{self, IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Writes notices to stdout unless quiet. Diagnostics are printed regardless.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
    color: ColorChoice,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        let color = if io::stdout().is_terminal() {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self { quiet, color }
    }

    /// Console that prints nothing but diagnostics
    pub fn silent() -> Self {
        Self {
            quiet: true,
            color: ColorChoice::Never,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn info(&self, line: &str) {
        if !self.quiet {
            let _ = self.emit(None, false, line);
        }
    }

    pub fn progress(&self, line: &str) {
        if !self.quiet {
            let _ = self.emit(Some(Color::Cyan), false, line);
        }
    }

    pub fn committed(&self) {
        if !self.quiet {
            let _ = self.emit(Some(Color::Green), true, "Committed");
        }
    }

    pub fn summary(&self, line: &str) {
        if !self.quiet {
            let _ = self.emit(None, true, line);
        }
    }

    /// One-line failure report
    pub fn diagnostic(&self, line: &str) {
        let _ = self.emit(Some(Color::Red), true, line);
    }

    /// Spinner for long blocking steps, None when quiet
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.quiet {
            None
        } else {
            Some(progress::spinner(message))
        }
    }

    fn emit(&self, color: Option<Color>, bold: bool, line: &str) -> io::Result<()> {
        let mut stdout = StandardStream::stdout(self.color);
        if color.is_some() || bold {
            stdout.set_color(ColorSpec::new().set_fg(color).set_bold(bold))?;
        }
        write!(stdout, "{}", line)?;
        stdout.reset()?;
        writeln!(stdout)?;
        stdout.flush()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(false)
    }
}
